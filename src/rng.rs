// -*- mode: rust; -*-
//
// This file is part of mpc-rng.
// See LICENSE for licensing information.

//! The per-participant RNG/RZG state machine.
//!
//! One [`RngMachine`] consumes the local player's output of the prior
//! biased-randomness step (b rows of verifiable sub-sharings plus the
//! commitment rows everyone agrees on) and drives the opening protocol
//! that turns them into b unbiased verifiably-shared secrets. The zero
//! variant (RZG) runs the same computation with every contribution scaled
//! by its receiver's index, which forces the constant term of the shared
//! polynomial, and hence the secret, to zero.
//!
//! The machine is synchronous: the caller forwards each peer's opening
//! batch as the transport delivers it, in any order, and dispatches on the
//! returned [`TransitionEvent`].

use group::{ff::Field, Group};

use crate::codec::{put_scalar_seq, scalar_seq, Reader, Wire, Writer, FIELD_BYTES};
use crate::opener::{Opener, OpenerEvent, Phase};
use crate::share::{commitment_of_share, share_of_share, Commitment, VerifiableShare};
use crate::{Error, Point, Scalar};

/// The event returned by every state-transition call on an [`RngMachine`].
#[derive(Clone, Debug, PartialEq)]
pub enum TransitionEvent {
    /// Construction processed commitments only; the share sets were absent
    /// or unusable.
    CommitmentsConstructed,
    /// The machine's own directed opening was built and buffered.
    SharesConstructed,
    /// A share batch was supplied in a state that does not accept one, or
    /// was inconsistent with the commitments.
    SharesIgnored,
    /// A peer's opening batch was verified and buffered.
    OpeningsAdded,
    /// A peer's opening batch was dropped without touching any state.
    OpeningsIgnored,
    /// The threshold was reached; the batch of verifiable shares has been
    /// reconstructed at the machine's own index.
    RngsReconstructed(Vec<VerifiableShare>),
}

/// Lifecycle of an [`RngMachine`], derived from its opener.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// No usable share sets have been consumed yet.
    Init,
    /// The machine's own opening is buffered; waiting on peers.
    WaitingOpen,
    /// The output shares have been reconstructed.
    Done,
}

/// The local player's openings addressed to a single peer.
///
/// The transport layer delivers `shares` to the participant identified by
/// `receiver`. The shares themselves stay indexed by the *sender*, which
/// is what the receiving opener interpolates over.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectedOpening {
    /// Index of the peer this batch is addressed to.
    pub receiver: Scalar,
    /// One share per batch element; empty when the share sets were absent.
    pub shares: Vec<VerifiableShare>,
}

/// Per-participant machine that turns one batch of biased-randomness
/// outputs into b jointly-random (or jointly-zero) verifiably-shared
/// secrets.
#[derive(Clone, Debug, PartialEq)]
pub struct RngMachine {
    index: Scalar,
    indices: Vec<Scalar>,
    batch_size: u32,
    threshold: u32,
    opener: Opener,
}

impl RngMachine {
    /// Consumes one biased-randomness output batch and transitions
    /// immediately.
    ///
    /// `sets_of_shares` is usable only when it holds exactly `batch_size`
    /// rows; anything else is treated as absent and construction proceeds
    /// from the commitments alone, leaving every directed opening empty.
    /// Malformed commitment rows, malformed rows of a usable share set,
    /// and bad protocol parameters are integration errors and panic.
    ///
    /// Returns the transition event, the machine, the directed openings
    /// for the transport layer (one per participant, in `indices` order),
    /// and the commitments to the final secrets.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: Scalar,
        indices: Vec<Scalar>,
        batch_size: u32,
        threshold: u32,
        h: Point,
        sets_of_shares: &[Vec<VerifiableShare>],
        sets_of_commitments: &[Vec<Commitment>],
        is_zero: bool,
    ) -> (TransitionEvent, RngMachine, Vec<DirectedOpening>, Vec<Commitment>) {
        assert!(batch_size >= 1, "batch size must be at least 1");
        assert!(threshold >= 1, "threshold must be at least 1");
        assert!(!is_zero || threshold >= 2, "a zero sharing needs threshold at least 2");
        assert!(indices.contains(&index), "own index must be a participant");
        assert!(
            indices.iter().all(|i| *i != Scalar::zero()),
            "participant indices must be non-zero"
        );
        for (at, i) in indices.iter().enumerate() {
            assert!(!indices[..at].contains(i), "participant indices must be distinct");
        }

        let b = batch_size as usize;
        let k = threshold as usize;
        let c = if is_zero { k - 1 } else { k };

        assert_eq!(sets_of_commitments.len(), b, "one commitment row per batch element");
        for row in sets_of_commitments {
            assert_eq!(row.len(), c, "commitment rows must hold one commitment per sub-sharing");
            for commitment in row {
                assert_eq!(commitment.len(), k, "sub-commitments must match the threshold");
            }
        }

        let shares_usable = sets_of_shares.len() == b;
        if shares_usable {
            for row in sets_of_shares {
                assert_eq!(row.len(), c, "share rows must hold one share per sub-sharing");
            }
        }

        // Commitments to the b final secrets: the degree-0 coefficient of
        // each sub-commitment, preceded by the identity for a zero
        // sharing.
        let mut output_commitments = Vec::with_capacity(b);
        for row in sets_of_commitments {
            let mut combined = Commitment::with_capacity(k);
            if is_zero {
                combined.append(Point::identity());
            }
            for commitment in row {
                combined.append(commitment.0[0]);
            }
            output_commitments.push(combined);
        }

        // Commitments the opener verifies incoming openings against: the
        // commitment rows evaluated at our own index.
        let locally_computed = sets_of_commitments
            .iter()
            .map(|row| {
                let combined = commitment_of_share(index, row);
                if is_zero {
                    combined.scale(index)
                } else {
                    combined
                }
            })
            .collect();

        let openings = directed_openings(&indices, sets_of_shares, shares_usable, is_zero);

        let opener = Opener::new(locally_computed, indices.clone(), h);
        let mut machine = RngMachine {
            index,
            indices,
            batch_size,
            threshold,
            opener,
        };

        let event = if shares_usable {
            machine.submit_own(&openings)
        } else {
            TransitionEvent::CommitmentsConstructed
        };

        (event, machine, openings, output_commitments)
    }

    /// The machine's own participant index.
    pub fn index(&self) -> Scalar {
        self.index
    }

    /// All participant indices, in protocol order.
    pub fn indices(&self) -> &[Scalar] {
        &self.indices
    }

    /// Number of secrets generated per protocol run.
    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// Distinct valid openings required to reconstruct.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Read-only view of the opener driving this machine.
    pub fn opener(&self) -> &Opener {
        &self.opener
    }

    /// The machine's lifecycle state, derived from the opener.
    pub fn state(&self) -> State {
        if self.opener.phase() == Phase::Done {
            State::Done
        } else if self.opener.has_contribution(self.index) {
            State::WaitingOpen
        } else {
            State::Init
        }
    }

    /// Forwards one peer's opening batch to the opener.
    ///
    /// Returns [`TransitionEvent::RngsReconstructed`] when the batch was
    /// the k-th distinct valid contribution,
    /// [`TransitionEvent::OpeningsAdded`] when it was buffered, and
    /// [`TransitionEvent::OpeningsIgnored`] otherwise.
    pub fn transition_open(&mut self, openings: &[VerifiableShare]) -> TransitionEvent {
        match self.opener.handle_share_batch(openings) {
            OpenerEvent::Done {
                secrets,
                decommitments,
            } => TransitionEvent::RngsReconstructed(self.wrap(secrets, decommitments)),
            OpenerEvent::SharesAdded => TransitionEvent::OpeningsAdded,
            OpenerEvent::Ignored => TransitionEvent::OpeningsIgnored,
        }
    }

    /// Supplies a share batch that was absent at construction.
    ///
    /// Only a machine still in [`State::Init`] accepts one; the directed
    /// openings are rebuilt exactly as construction would have built them
    /// and the machine's own opening is fed to the opener. Row-length
    /// mismatches of a usable batch panic, as at construction.
    pub fn transition_shares(
        &mut self,
        sets_of_shares: &[Vec<VerifiableShare>],
        is_zero: bool,
    ) -> (TransitionEvent, Vec<DirectedOpening>) {
        assert!(
            !is_zero || self.threshold >= 2,
            "a zero sharing needs threshold at least 2"
        );
        if self.state() != State::Init {
            return (TransitionEvent::SharesIgnored, Vec::new());
        }

        let b = self.batch_size as usize;
        let k = self.threshold as usize;
        let c = if is_zero { k - 1 } else { k };

        if sets_of_shares.len() != b {
            return (TransitionEvent::SharesIgnored, Vec::new());
        }
        for row in sets_of_shares {
            assert_eq!(row.len(), c, "share rows must hold one share per sub-sharing");
        }

        let openings = directed_openings(&self.indices, sets_of_shares, true, is_zero);
        let event = self.submit_own(&openings);
        (event, openings)
    }

    // Feeds the opening addressed to ourselves into the opener.
    fn submit_own(&mut self, openings: &[DirectedOpening]) -> TransitionEvent {
        let own = openings
            .iter()
            .find(|opening| opening.receiver == self.index)
            .expect("own index must be a participant");
        match self.opener.handle_share_batch(&own.shares) {
            OpenerEvent::Done {
                secrets,
                decommitments,
            } => TransitionEvent::RngsReconstructed(self.wrap(secrets, decommitments)),
            OpenerEvent::SharesAdded => TransitionEvent::SharesConstructed,
            OpenerEvent::Ignored => TransitionEvent::SharesIgnored,
        }
    }

    // Attaches our index to an interpolated batch.
    fn wrap(&self, secrets: Vec<Scalar>, decommitments: Vec<Scalar>) -> Vec<VerifiableShare> {
        secrets
            .into_iter()
            .zip(decommitments)
            .map(|(secret, decommitment)| VerifiableShare::new(self.index, secret, decommitment))
            .collect()
    }
}

// One opening per participant, in `indices` order; empty batches when the
// share sets are absent. The zero-sharing twist scales each opening by its
// receiver's index.
fn directed_openings(
    indices: &[Scalar],
    sets_of_shares: &[Vec<VerifiableShare>],
    shares_usable: bool,
    is_zero: bool,
) -> Vec<DirectedOpening> {
    indices
        .iter()
        .map(|&receiver| {
            let shares = if shares_usable {
                sets_of_shares
                    .iter()
                    .map(|row| {
                        let mut share = share_of_share(receiver, row);
                        if is_zero {
                            share.scale(receiver);
                        }
                        share
                    })
                    .collect()
            } else {
                Vec::new()
            };
            DirectedOpening { receiver, shares }
        })
        .collect()
}

impl Wire for RngMachine {
    fn size_hint(&self) -> usize {
        FIELD_BYTES + 4 + FIELD_BYTES * self.indices.len() + 4 + 4 + self.opener.size_hint()
    }

    fn marshal(&self, w: &mut Writer<'_>) -> Result<(), Error> {
        w.put_scalar("rng.index", &self.index)?;
        put_scalar_seq(w, "rng.indices", &self.indices)?;
        w.put_u32("rng.batch_size", self.batch_size)?;
        w.put_u32("rng.threshold", self.threshold)?;
        self.opener.marshal(w)
    }

    fn unmarshal(r: &mut Reader<'_>) -> Result<Self, Error> {
        let index = r.scalar("rng.index")?;
        let indices = scalar_seq(r, "rng.indices")?;
        let batch_size = r.u32("rng.batch_size")?;
        let threshold = r.u32("rng.threshold")?;
        let opener = Opener::unmarshal(r)?;
        if opener.batch_size() != batch_size as usize || opener.threshold() != threshold as usize {
            return Err(Error::Malformed("rng.opener"));
        }
        Ok(RngMachine {
            index,
            indices,
            batch_size,
            threshold,
            opener,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;
    use rand_core::RngCore;

    // The smallest possible protocol: one participant, threshold one, one
    // batched secret. The single sub-sharing polynomial is a constant.
    fn singleton_batch<R: RngCore>(
        rng: &mut R,
        index: Scalar,
        h: &Point,
    ) -> (Scalar, Vec<Vec<VerifiableShare>>, Vec<Vec<Commitment>>) {
        let value = Scalar::random(&mut *rng);
        let blind = Scalar::random(&mut *rng);
        let mut commitment = Commitment::with_capacity(1);
        commitment.append(Point::generator() * value + h * blind);
        (
            value,
            vec![vec![VerifiableShare::new(index, value, blind)]],
            vec![vec![commitment]],
        )
    }

    #[test]
    fn threshold_one_reconstructs_at_construction() {
        let mut rng = thread_rng();
        let h = Point::random(&mut rng);
        let index = Scalar::from(7);
        let (value, shares, commitments) = singleton_batch(&mut rng, index, &h);

        let (event, machine, openings, output_commitments) =
            RngMachine::new(index, vec![index], 1, 1, h, &shares, &commitments, false);

        match event {
            TransitionEvent::RngsReconstructed(reconstructed) => {
                assert_eq!(reconstructed.len(), 1);
                assert_eq!(reconstructed[0].index(), index);
                assert_eq!(reconstructed[0].value(), value);
                assert!(reconstructed[0].verify(&output_commitments[0], &h));
            }
            event => panic!("expected immediate reconstruction, got {:?}", event),
        }
        assert_eq!(machine.state(), State::Done);
        assert_eq!(openings.len(), 1);
        assert_eq!(openings[0].receiver, index);
    }

    #[test]
    fn late_share_sets_drive_init_to_done() {
        let mut rng = thread_rng();
        let h = Point::random(&mut rng);
        let index = Scalar::from(7);
        let (_, shares, commitments) = singleton_batch(&mut rng, index, &h);

        let (event, mut machine, openings, _) =
            RngMachine::new(index, vec![index], 1, 1, h, &[], &commitments, false);
        assert_eq!(event, TransitionEvent::CommitmentsConstructed);
        assert_eq!(machine.state(), State::Init);
        assert!(openings.iter().all(|opening| opening.shares.is_empty()));

        let (event, openings) = machine.transition_shares(&shares, false);
        match event {
            TransitionEvent::RngsReconstructed(_) => {}
            event => panic!("expected reconstruction, got {:?}", event),
        }
        assert_eq!(openings.len(), 1);
        assert_eq!(machine.state(), State::Done);

        // A second share batch no longer has a machine to feed.
        let (event, openings) = machine.transition_shares(&shares, false);
        assert_eq!(event, TransitionEvent::SharesIgnored);
        assert!(openings.is_empty());
    }

    #[test]
    fn inconsistent_own_shares_are_surfaced() {
        let mut rng = thread_rng();
        let h = Point::random(&mut rng);
        let index = Scalar::from(7);
        let (_, _, commitments) = singleton_batch(&mut rng, index, &h);
        let (_, mismatched_shares, _) = singleton_batch(&mut rng, index, &h);

        let (event, machine, _, _) = RngMachine::new(
            index,
            vec![index],
            1,
            1,
            h,
            &mismatched_shares,
            &commitments,
            false,
        );
        assert_eq!(event, TransitionEvent::SharesIgnored);
        assert_eq!(machine.state(), State::Init);
    }

    #[test]
    #[should_panic(expected = "participant indices must be distinct")]
    fn duplicate_indices_panic() {
        let mut rng = thread_rng();
        let h = Point::random(&mut rng);
        let index = Scalar::from(7);
        let (_, shares, commitments) = singleton_batch(&mut rng, index, &h);
        RngMachine::new(index, vec![index, index], 1, 1, h, &shares, &commitments, false);
    }

    #[test]
    fn machine_round_trip() {
        let mut rng = thread_rng();
        let h = Point::random(&mut rng);
        let index = Scalar::from(7);
        let (_, shares, commitments) = singleton_batch(&mut rng, index, &h);
        let (_, machine, _, _) =
            RngMachine::new(index, vec![index], 1, 1, h, &shares, &commitments, false);

        let mut buf = vec![0; machine.size_hint()];
        assert_eq!(machine.marshal_to(&mut buf), Ok(buf.len()));
        assert_eq!(RngMachine::unmarshal_from(&buf), Ok(machine));
    }
}
