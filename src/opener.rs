// -*- mode: rust; -*-
//
// This file is part of mpc-rng.
// See LICENSE for licensing information.

//! Collection of directed openings and threshold reconstruction.
//!
//! An [`Opener`] holds the batch of commitments the local player computed
//! for itself and accepts directed openings from peers, one batch per
//! sender. Every batch is verified in full against the commitments before
//! any of it is buffered; once openings from `k` distinct senders are in,
//! the secrets and their decommitments are reconstructed by Lagrange
//! interpolation at zero and the opener refuses all further input.

use group::ff::Field;

use crate::codec::{put_scalar_seq, scalar_seq, Reader, Wire, Writer, FIELD_BYTES};
use crate::share::{Commitment, VerifiableShare};
use crate::{Error, Point, Scalar};

/// The opener's reply to one submitted share batch.
#[derive(Clone, Debug, PartialEq)]
pub enum OpenerEvent {
    /// The batch was verified and buffered; the threshold is not yet met.
    SharesAdded,
    /// The batch was the k-th distinct valid contribution; every batched
    /// secret and its decommitment have been reconstructed.
    Done {
        /// The interpolated secrets, one per batch element.
        secrets: Vec<Scalar>,
        /// The interpolated decommitment scalars, one per batch element.
        decommitments: Vec<Scalar>,
    },
    /// The batch was dropped without touching any state.
    Ignored,
}

/// Collection phase of an [`Opener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Fewer than k distinct senders have contributed.
    Waiting,
    /// Reconstruction has happened; all further batches are ignored.
    Done,
}

/// Collects directed openings keyed by sender index and reconstructs once
/// the threshold of distinct valid contributions is reached.
#[derive(Clone, Debug, PartialEq)]
pub struct Opener {
    commitments: Vec<Commitment>,
    indices: Vec<Scalar>,
    h: Point,
    buffered: Vec<Vec<VerifiableShare>>,
    seen: Vec<Scalar>,
    phase: Phase,
}

impl Opener {
    /// Builds an opener over the local player's batch of commitments.
    ///
    /// The batch size is the number of commitments and the reconstruction
    /// threshold is their common length. Panics if the batch is empty or
    /// the commitments disagree in length.
    pub fn new(commitments: Vec<Commitment>, indices: Vec<Scalar>, h: Point) -> Self {
        assert!(!commitments.is_empty(), "opener needs at least one commitment");
        assert!(!commitments[0].is_empty(), "commitments must not be empty");
        for commitment in &commitments {
            assert_eq!(commitment.len(), commitments[0].len(), "commitment lengths must match");
        }

        let buffered = vec![Vec::new(); commitments.len()];
        Opener {
            commitments,
            indices,
            h,
            buffered,
            seen: Vec::new(),
            phase: Phase::Waiting,
        }
    }

    /// Number of secrets reconstructed together.
    pub fn batch_size(&self) -> usize {
        self.commitments.len()
    }

    /// Distinct valid contributions required to reconstruct.
    pub fn threshold(&self) -> usize {
        self.commitments[0].len()
    }

    /// Current collection phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of distinct senders that have contributed so far.
    pub fn contributions(&self) -> usize {
        self.seen.len()
    }

    /// Whether `index` has already contributed a batch.
    pub fn has_contribution(&self, index: Scalar) -> bool {
        self.seen.contains(&index)
    }

    /// Verifies and buffers one sender's batch.
    ///
    /// The whole batch is checked before any state changes: a batch of the
    /// wrong length, with mixed sender indices, from an unknown or
    /// already-seen sender, or containing any share that fails
    /// verification is ignored outright.
    pub fn handle_share_batch(&mut self, batch: &[VerifiableShare]) -> OpenerEvent {
        if self.phase == Phase::Done {
            return OpenerEvent::Ignored;
        }
        if batch.len() != self.batch_size() {
            return OpenerEvent::Ignored;
        }
        let sender = batch[0].index();
        if batch.iter().any(|share| share.index() != sender) {
            return OpenerEvent::Ignored;
        }
        if !self.indices.contains(&sender) || self.seen.contains(&sender) {
            return OpenerEvent::Ignored;
        }
        if !batch
            .iter()
            .zip(&self.commitments)
            .all(|(share, commitment)| share.verify(commitment, &self.h))
        {
            return OpenerEvent::Ignored;
        }

        for (buffer, share) in self.buffered.iter_mut().zip(batch) {
            buffer.push(*share);
        }
        self.seen.push(sender);

        if self.seen.len() < self.threshold() {
            return OpenerEvent::SharesAdded;
        }

        self.phase = Phase::Done;
        let (secrets, decommitments) = self.reconstruct();
        OpenerEvent::Done {
            secrets,
            decommitments,
        }
    }

    // Interpolates every batch element from the first k buffered
    // contributions at x = 0.
    fn reconstruct(&self) -> (Vec<Scalar>, Vec<Scalar>) {
        let k = self.threshold();
        let basis = lagrange_basis_at_zero(&self.seen[..k]);

        let mut secrets = Vec::with_capacity(self.batch_size());
        let mut decommitments = Vec::with_capacity(self.batch_size());
        for buffer in &self.buffered {
            let mut secret = Scalar::zero();
            let mut decommitment = Scalar::zero();
            for (share, coefficient) in buffer.iter().take(k).zip(&basis) {
                secret += share.value() * coefficient;
                decommitment += share.decommitment() * coefficient;
            }
            secrets.push(secret);
            decommitments.push(decommitment);
        }
        (secrets, decommitments)
    }
}

// The Lagrange basis over `indices`, evaluated at x = 0.
fn lagrange_basis_at_zero(indices: &[Scalar]) -> Vec<Scalar> {
    indices
        .iter()
        .map(|i| {
            let mut num = Scalar::one();
            let mut den = Scalar::one();
            for l in indices {
                if l == i {
                    continue;
                }
                num *= l;
                den *= l - i;
            }
            // Safe as contributing indices are deduplicated on acceptance,
            // making the denominator a product of non-zero differences.
            num * den.invert().unwrap()
        })
        .collect()
}

impl Wire for Opener {
    fn size_hint(&self) -> usize {
        4 + self.commitments.iter().map(Wire::size_hint).sum::<usize>()
            + 4
            + FIELD_BYTES * self.indices.len()
            + FIELD_BYTES
            + self
                .buffered
                .iter()
                .map(|buffer| 4 + 3 * FIELD_BYTES * buffer.len())
                .sum::<usize>()
            + 4
            + FIELD_BYTES * self.seen.len()
            + 1
    }

    fn marshal(&self, w: &mut Writer<'_>) -> Result<(), Error> {
        let count =
            u32::try_from(self.commitments.len()).map_err(|_| Error::Malformed("opener.commitments"))?;
        w.put_u32("opener.commitments", count)?;
        for commitment in &self.commitments {
            commitment.marshal(w)?;
        }
        put_scalar_seq(w, "opener.indices", &self.indices)?;
        w.put_point("opener.h", &self.h)?;
        for buffer in &self.buffered {
            let count =
                u32::try_from(buffer.len()).map_err(|_| Error::Malformed("opener.buffered"))?;
            w.put_u32("opener.buffered", count)?;
            for share in buffer {
                share.marshal(w)?;
            }
        }
        put_scalar_seq(w, "opener.seen", &self.seen)?;
        w.put_u8(
            "opener.phase",
            match self.phase {
                Phase::Waiting => 0,
                Phase::Done => 1,
            },
        )
    }

    fn unmarshal(r: &mut Reader<'_>) -> Result<Self, Error> {
        let count = r.u32("opener.commitments")?;
        if count == 0 {
            return Err(Error::Malformed("opener.commitments"));
        }
        let mut commitments = Vec::new();
        for _ in 0..count {
            commitments.push(Commitment::unmarshal(r)?);
        }
        if commitments[0].is_empty()
            || commitments.iter().any(|c| c.len() != commitments[0].len())
        {
            return Err(Error::Malformed("opener.commitments"));
        }

        let indices = scalar_seq(r, "opener.indices")?;
        let h = r.point("opener.h")?;

        let mut buffered = Vec::with_capacity(commitments.len());
        for _ in 0..commitments.len() {
            let count = r.u32("opener.buffered")?;
            let mut buffer = Vec::new();
            for _ in 0..count {
                buffer.push(VerifiableShare::unmarshal(r)?);
            }
            buffered.push(buffer);
        }

        let seen = scalar_seq(r, "opener.seen")?;
        let phase = match r.u8("opener.phase")? {
            0 => Phase::Waiting,
            1 => Phase::Done,
            _ => return Err(Error::Malformed("opener.phase")),
        };

        Ok(Opener {
            commitments,
            indices,
            h,
            buffered,
            seen,
            phase,
        })
    }
}
