#![deny(missing_docs)]

//! Batched verifiable random number generation for threshold MPC.
//!
//! A fixed set of participants, identified by distinct non-zero scalar
//! indices, jointly produce a batch of unbiased secrets, each verifiably
//! shared under Pedersen commitments, without any single party learning
//! them. The same machinery with one algebraic twist produces verifiable
//! sharings of zero, used as a masking primitive by higher-level MPC
//! protocols.
//!
//! Each participant runs an [`RngMachine`] over the output of a prior
//! biased-randomness step: the machine derives the commitments to the
//! final secrets, addresses one directed opening to every peer, and feeds
//! openings received from peers to its [`Opener`] until a threshold of
//! distinct contributions reconstructs the local player's output shares.
//! Transport between machines, and the biased-randomness step itself, are
//! the caller's concern; the machine is synchronous and single-owner.

mod codec;
mod error;
mod opener;
mod rng;
mod share;

pub use codec::{Reader, Wire, Writer, FIELD_BYTES};
pub use error::Error;
pub use opener::{Opener, OpenerEvent, Phase};
pub use rng::{DirectedOpening, RngMachine, State, TransitionEvent};
pub use share::{commitment_of_share, share_of_share, Commitment, VerifiableShare};

use group::Group;
use rand_core::{CryptoRng, RngCore};

/// An element of the Jubjub scalar field.
pub type Scalar = jubjub::Fr;

/// An element of the Jubjub curve group.
pub type Point = jubjub::ExtendedPoint;

/// Samples the Pedersen blinding generator `h`, once per protocol
/// instance.
///
/// Every participant must use the same `h`, and the sampler must not
/// retain anything relating it to the curve generator; the binding of the
/// commitments rests on that discrete log staying unknown.
pub fn pedersen_parameter<R: RngCore + CryptoRng>(rng: R) -> Point {
    Point::random(rng)
}
