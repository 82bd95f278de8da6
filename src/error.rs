// -*- mode: rust; -*-
//
// This file is part of mpc-rng.
// See LICENSE for licensing information.

use thiserror::Error;

/// An error arising from marshalling or unmarshalling protocol state.
///
/// The embedded string names the field that was in progress when the
/// operation failed, so callers can report which part of a blob was
/// truncated or corrupted.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum Error {
    /// The remaining-bytes budget is too small for the field.
    #[error("{0}: buffer too short")]
    ShortBuffer(&'static str),
    /// The bytes for the field are not a canonical encoding.
    #[error("{0}: malformed encoding")]
    Malformed(&'static str),
}
