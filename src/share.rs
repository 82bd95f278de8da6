// -*- mode: rust; -*-
//
// This file is part of mpc-rng.
// See LICENSE for licensing information.

//! Verifiable shares and commitment polynomials.
//!
//! A verifiable share binds a plain Shamir share to a public commitment
//! polynomial through a Pedersen decommitment scalar: the share `(v, d)`
//! at index `j` opens the commitment `C` iff `v·G + d·h == C(j)`, where
//! `C`'s coefficients are group points committing to the coefficients of
//! the sharing polynomial and `h` is the protocol's blinding generator.
//!
//! The row combinators [`share_of_share`] and [`commitment_of_share`]
//! treat a row of sub-shares (or sub-commitments) as the coefficients of a
//! further polynomial and evaluate it at a peer's index; they are the
//! workhorses behind directed-opening construction.

use group::{ff::Field, Group};
use zeroize::DefaultIsZeroes;

use crate::codec::{Reader, Wire, Writer, FIELD_BYTES};
use crate::{Error, Point, Scalar};

/// A Shamir share and its Pedersen decommitment, attached to the index the
/// sharing polynomial was evaluated at.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VerifiableShare {
    index: Scalar,
    value: Scalar,
    decommitment: Scalar,
}

// Zeroizes share material to the `Default` value on drop (when it goes out
// of scope). The derived `Default` is the all-zero scalar triple.
impl DefaultIsZeroes for VerifiableShare {}

impl VerifiableShare {
    /// Assembles a share from its parts.
    pub fn new(index: Scalar, value: Scalar, decommitment: Scalar) -> Self {
        VerifiableShare {
            index,
            value,
            decommitment,
        }
    }

    /// The index the sharing polynomial was evaluated at.
    pub fn index(&self) -> Scalar {
        self.index
    }

    /// The plain Shamir share value.
    pub fn value(&self) -> Scalar {
        self.value
    }

    /// The Pedersen decommitment scalar.
    pub fn decommitment(&self) -> Scalar {
        self.decommitment
    }

    /// Whether this share opens `commitment` at its own index under the
    /// blinding generator `h`.
    pub fn verify(&self, commitment: &Commitment, h: &Point) -> bool {
        Point::generator() * self.value + h * self.decommitment
            == commitment.evaluate(self.index)
    }

    /// Multiplies the value and the decommitment by `scale`, leaving the
    /// index untouched.
    pub fn scale(&mut self, scale: Scalar) {
        self.value *= scale;
        self.decommitment *= scale;
    }
}

/// Commitments to the coefficients of a sharing polynomial, as points in
/// the exponent.
///
/// Evaluating a commitment at a share index yields the Pedersen commitment
/// that the verifiable share at that index must open.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Commitment(pub(crate) Vec<Point>);

impl Commitment {
    /// An empty commitment with room for `capacity` coefficients.
    pub fn with_capacity(capacity: usize) -> Self {
        Commitment(Vec::with_capacity(capacity))
    }

    /// Appends the next-higher-degree coefficient.
    pub fn append(&mut self, coefficient: Point) {
        self.0.push(coefficient);
    }

    /// Number of coefficients; one more than the committed polynomial's
    /// degree, and equal to the reconstruction threshold.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the commitment holds no coefficients.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Evaluates the committed polynomial at `x` in the exponent.
    ///
    /// The running time depends only on the number of coefficients, not on
    /// the value of `x`.
    pub fn evaluate(&self, x: Scalar) -> Point {
        let (_, result) = self.0.iter().fold(
            (Scalar::one(), Point::identity()),
            |(pow, acc), coefficient| (pow * x, acc + coefficient * pow),
        );
        result
    }

    /// Scales every coefficient by `scale`.
    pub fn scale(&self, scale: Scalar) -> Commitment {
        Commitment(self.0.iter().map(|coefficient| coefficient * scale).collect())
    }

    /// Adds another commitment of the same length, pointwise.
    ///
    /// Panics if the lengths differ.
    pub fn add(&self, other: &Commitment) -> Commitment {
        assert_eq!(self.0.len(), other.0.len(), "commitment lengths must match");
        Commitment(
            self.0
                .iter()
                .zip(&other.0)
                .map(|(ours, theirs)| ours + theirs)
                .collect(),
        )
    }
}

/// Evaluates a row of sub-shares as a polynomial at `to`, componentwise.
///
/// The row holds the local player's share of each coefficient of a
/// combined polynomial; the result is the local player's contribution to
/// `to`'s share of that polynomial. The result keeps the row's index.
///
/// Panics if the row is empty.
pub fn share_of_share(to: Scalar, row: &[VerifiableShare]) -> VerifiableShare {
    assert!(!row.is_empty(), "share row must not be empty");
    debug_assert!(row.iter().all(|share| share.index == row[0].index));

    let mut value = Scalar::zero();
    let mut decommitment = Scalar::zero();
    let mut pow = Scalar::one();
    for share in row {
        value += share.value * pow;
        decommitment += share.decommitment * pow;
        pow *= to;
    }
    VerifiableShare {
        index: row[0].index,
        value,
        decommitment,
    }
}

/// The commitment-side analogue of [`share_of_share`]: combines a row of
/// commitments with powers of `to`, pointwise in the exponent.
///
/// Panics if the row is empty or its commitments disagree in length.
pub fn commitment_of_share(to: Scalar, row: &[Commitment]) -> Commitment {
    assert!(!row.is_empty(), "commitment row must not be empty");

    let mut combined = vec![Point::identity(); row[0].len()];
    let mut pow = Scalar::one();
    for commitment in row {
        assert_eq!(commitment.len(), row[0].len(), "commitment lengths must match");
        for (acc, coefficient) in combined.iter_mut().zip(&commitment.0) {
            *acc += coefficient * pow;
        }
        pow *= to;
    }
    Commitment(combined)
}

impl Wire for VerifiableShare {
    fn size_hint(&self) -> usize {
        3 * FIELD_BYTES
    }

    fn marshal(&self, w: &mut Writer<'_>) -> Result<(), Error> {
        w.put_scalar("share.index", &self.index)?;
        w.put_scalar("share.value", &self.value)?;
        w.put_scalar("share.decommitment", &self.decommitment)
    }

    fn unmarshal(r: &mut Reader<'_>) -> Result<Self, Error> {
        Ok(VerifiableShare {
            index: r.scalar("share.index")?,
            value: r.scalar("share.value")?,
            decommitment: r.scalar("share.decommitment")?,
        })
    }
}

impl Wire for Commitment {
    fn size_hint(&self) -> usize {
        4 + FIELD_BYTES * self.0.len()
    }

    fn marshal(&self, w: &mut Writer<'_>) -> Result<(), Error> {
        let count = u32::try_from(self.0.len()).map_err(|_| Error::Malformed("commitment.len"))?;
        w.put_u32("commitment.len", count)?;
        for coefficient in &self.0 {
            w.put_point("commitment.coefficient", coefficient)?;
        }
        Ok(())
    }

    fn unmarshal(r: &mut Reader<'_>) -> Result<Self, Error> {
        let count = r.u32("commitment.len")?;
        let mut coefficients = Vec::new();
        for _ in 0..count {
            coefficients.push(r.point("commitment.coefficient")?);
        }
        Ok(Commitment(coefficients))
    }
}
