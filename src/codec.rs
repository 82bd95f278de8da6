// -*- mode: rust; -*-
//
// This file is part of mpc-rng.
// See LICENSE for licensing information.

//! Budget-checked binary encoding of persisted protocol state.
//!
//! All multi-byte integers are big-endian with no padding. A [`Writer`]
//! refuses to write past the end of the buffer it wraps and a [`Reader`]
//! refuses to read past it; either failure names the field that was in
//! progress. Scalars are encoded as 32 big-endian bytes and points in
//! their 32-byte compressed affine form; non-canonical encodings are
//! rejected on decode.

use crate::{Error, Point, Scalar};

/// Width in bytes of an encoded scalar or compressed point.
pub const FIELD_BYTES: usize = 32;

/// Binary encoding of persisted protocol state.
pub trait Wire: Sized {
    /// Exact number of bytes [`marshal`](Wire::marshal) will write.
    fn size_hint(&self) -> usize;

    /// Encodes `self` into the writer.
    fn marshal(&self, w: &mut Writer<'_>) -> Result<(), Error>;

    /// Decodes a value from the reader.
    fn unmarshal(r: &mut Reader<'_>) -> Result<Self, Error>;

    /// Encodes `self` into `buf`, returning the number of bytes written.
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(buf);
        self.marshal(&mut w)?;
        Ok(w.written())
    }

    /// Decodes a value from the front of `buf`.
    fn unmarshal_from(buf: &[u8]) -> Result<Self, Error> {
        Self::unmarshal(&mut Reader::new(buf))
    }
}

/// A bounded big-endian writer over a caller-supplied buffer.
pub struct Writer<'a> {
    buf: &'a mut [u8],
    at: usize,
}

impl<'a> Writer<'a> {
    /// Wraps a buffer; the buffer length is the write budget.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Writer { buf, at: 0 }
    }

    /// Number of bytes written so far.
    pub fn written(&self) -> usize {
        self.at
    }

    fn put(&mut self, field: &'static str, bytes: &[u8]) -> Result<(), Error> {
        let end = self.at + bytes.len();
        if end > self.buf.len() {
            return Err(Error::ShortBuffer(field));
        }
        self.buf[self.at..end].copy_from_slice(bytes);
        self.at = end;
        Ok(())
    }

    /// Writes a single byte.
    pub fn put_u8(&mut self, field: &'static str, v: u8) -> Result<(), Error> {
        self.put(field, &[v])
    }

    /// Writes a 32-bit unsigned integer.
    pub fn put_u32(&mut self, field: &'static str, v: u32) -> Result<(), Error> {
        self.put(field, &v.to_be_bytes())
    }

    /// Writes a scalar as 32 big-endian bytes.
    pub fn put_scalar(&mut self, field: &'static str, s: &Scalar) -> Result<(), Error> {
        let mut bytes = s.to_bytes();
        bytes.reverse();
        self.put(field, &bytes)
    }

    /// Writes a point in its compressed affine encoding.
    pub fn put_point(&mut self, field: &'static str, p: &Point) -> Result<(), Error> {
        self.put(field, &jubjub::AffinePoint::from(*p).to_bytes())
    }
}

/// A bounded reader over an encoded buffer.
pub struct Reader<'a> {
    buf: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    /// Wraps a buffer; the buffer length is the read budget.
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, at: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.at
    }

    fn take(&mut self, field: &'static str, n: usize) -> Result<&'a [u8], Error> {
        let end = self.at.checked_add(n).ok_or(Error::ShortBuffer(field))?;
        if end > self.buf.len() {
            return Err(Error::ShortBuffer(field));
        }
        let bytes = &self.buf[self.at..end];
        self.at = end;
        Ok(bytes)
    }

    /// Reads a single byte.
    pub fn u8(&mut self, field: &'static str) -> Result<u8, Error> {
        Ok(self.take(field, 1)?[0])
    }

    /// Reads a 32-bit unsigned integer.
    pub fn u32(&mut self, field: &'static str) -> Result<u32, Error> {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(self.take(field, 4)?);
        Ok(u32::from_be_bytes(bytes))
    }

    /// Reads a canonically-encoded scalar.
    pub fn scalar(&mut self, field: &'static str) -> Result<Scalar, Error> {
        let mut bytes = [0; FIELD_BYTES];
        bytes.copy_from_slice(self.take(field, FIELD_BYTES)?);
        bytes.reverse();
        Option::from(Scalar::from_bytes(&bytes)).ok_or(Error::Malformed(field))
    }

    /// Reads a canonically-encoded point.
    pub fn point(&mut self, field: &'static str) -> Result<Point, Error> {
        let mut bytes = [0; FIELD_BYTES];
        bytes.copy_from_slice(self.take(field, FIELD_BYTES)?);
        let affine: Option<jubjub::AffinePoint> = Option::from(jubjub::AffinePoint::from_bytes(bytes));
        affine.map(Point::from).ok_or(Error::Malformed(field))
    }
}

pub(crate) fn put_scalar_seq(
    w: &mut Writer<'_>,
    field: &'static str,
    scalars: &[Scalar],
) -> Result<(), Error> {
    let count = u32::try_from(scalars.len()).map_err(|_| Error::Malformed(field))?;
    w.put_u32(field, count)?;
    for scalar in scalars {
        w.put_scalar(field, scalar)?;
    }
    Ok(())
}

pub(crate) fn scalar_seq(r: &mut Reader<'_>, field: &'static str) -> Result<Vec<Scalar>, Error> {
    let count = r.u32(field)?;
    let mut scalars = Vec::new();
    for _ in 0..count {
        scalars.push(r.scalar(field)?);
    }
    Ok(scalars)
}
