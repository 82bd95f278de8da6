//! A minimal stand-in for the biased-randomness step shared by the
//! integration tests: random sub-sharing polynomials with Pedersen
//! coefficient commitments, one share row per player, plus the plumbing
//! to spawn a machine for every participant.
#![allow(dead_code)]

use group::{ff::Field, Group};
use rand_core::{CryptoRng, RngCore};

use mpc_rng::{
    Commitment, DirectedOpening, Point, RngMachine, Scalar, TransitionEvent, VerifiableShare,
};

/// Evaluates a scalar polynomial (lowest coefficient first) at `x`.
pub fn poly_eval(coefficients: &[Scalar], x: Scalar) -> Scalar {
    let mut value = Scalar::zero();
    for coefficient in coefficients.iter().rev() {
        value = value * x + coefficient;
    }
    value
}

/// Interpolates `points` at x = 0.
pub fn lagrange_zero(points: &[(Scalar, Scalar)]) -> Scalar {
    let mut value = Scalar::zero();
    for (x, y) in points {
        let mut num = Scalar::one();
        let mut den = Scalar::one();
        for (other, _) in points {
            if other == x {
                continue;
            }
            num *= other;
            den *= other - x;
        }
        value += y * num * den.invert().unwrap();
    }
    value
}

/// Distinct non-zero random participant indices.
pub fn random_indices<R: RngCore + CryptoRng>(rng: &mut R, n: usize) -> Vec<Scalar> {
    let mut indices = Vec::with_capacity(n);
    while indices.len() < n {
        let candidate = Scalar::random(&mut *rng);
        if candidate != Scalar::zero() && !indices.contains(&candidate) {
            indices.push(candidate);
        }
    }
    indices
}

/// One player's biased-randomness output: b rows of sub-shares plus the
/// commitment rows every player agrees on.
pub struct BrngOutput {
    pub sets_of_shares: Vec<Vec<VerifiableShare>>,
    pub sets_of_commitments: Vec<Vec<Commitment>>,
}

/// Simulates the biased-randomness step for every player at once.
pub fn brng_outputs<R: RngCore + CryptoRng>(
    rng: &mut R,
    indices: &[Scalar],
    h: Point,
    batch_size: usize,
    threshold: usize,
    is_zero: bool,
) -> Vec<BrngOutput> {
    let c = if is_zero { threshold - 1 } else { threshold };

    let mut outputs: Vec<BrngOutput> = indices
        .iter()
        .map(|_| BrngOutput {
            sets_of_shares: vec![Vec::with_capacity(c); batch_size],
            sets_of_commitments: vec![Vec::with_capacity(c); batch_size],
        })
        .collect();

    for i in 0..batch_size {
        for _ in 0..c {
            let values: Vec<Scalar> = (0..threshold).map(|_| Scalar::random(&mut *rng)).collect();
            let blinds: Vec<Scalar> = (0..threshold).map(|_| Scalar::random(&mut *rng)).collect();
            let mut commitment = Commitment::with_capacity(threshold);
            for (value, blind) in values.iter().zip(&blinds) {
                commitment.append(Point::generator() * value + h * blind);
            }

            for (player, output) in indices.iter().zip(&mut outputs) {
                output.sets_of_shares[i].push(VerifiableShare::new(
                    *player,
                    poly_eval(&values, *player),
                    poly_eval(&blinds, *player),
                ));
                output.sets_of_commitments[i].push(commitment.clone());
            }
        }
    }
    outputs
}

/// One participant's machine together with everything construction
/// returned.
pub struct Player {
    pub event: TransitionEvent,
    pub machine: RngMachine,
    pub openings: Vec<DirectedOpening>,
    pub output_commitments: Vec<Commitment>,
}

/// Spawns a machine per participant over the given BRNG outputs.
pub fn spawn_players(
    indices: &[Scalar],
    h: Point,
    batch_size: u32,
    threshold: u32,
    is_zero: bool,
    outputs: &[BrngOutput],
) -> Vec<Player> {
    indices
        .iter()
        .zip(outputs)
        .map(|(index, output)| {
            let (event, machine, openings, output_commitments) = RngMachine::new(
                *index,
                indices.to_vec(),
                batch_size,
                threshold,
                h,
                &output.sets_of_shares,
                &output.sets_of_commitments,
                is_zero,
            );
            Player {
                event,
                machine,
                openings,
                output_commitments,
            }
        })
        .collect()
}

/// The opening batches addressed to the player at `receiver_at`, one per
/// sender, aligned with the participant order.
pub fn batches_for(players: &[Player], receiver_at: usize) -> Vec<Vec<VerifiableShare>> {
    players
        .iter()
        .map(|player| player.openings[receiver_at].shares.clone())
        .collect()
}
