//! Canonical little-endian binary codec for serialized stores.
//!
//! Every multi-byte integer is written little-endian and byte-swapped on
//! read regardless of the host byte order, so a store written on one machine
//! deserializes identically on any other. Vectors are length-prefixed with a
//! `u64` element count.

use crate::core::error::{GbdtError, Result};
use std::io;

/// An interface for serializing binary data to a target.
pub trait BinaryWriter {
    /// Append data to this binary target.
    ///
    /// Returns the number of bytes written, or an error if the write fails.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;
}

/// A simple implementation of [`BinaryWriter`] that appends to a `Vec<u8>`.
#[derive(Debug, Clone, Default)]
pub struct VecBinaryWriter {
    buffer: Vec<u8>,
}

impl VecBinaryWriter {
    /// Create a new writer with an empty buffer.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new writer with a pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Get a reference to the internal buffer.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the length of the buffer.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Take ownership of the internal buffer.
    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }
}

impl BinaryWriter for VecBinaryWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(data);
        Ok(data.len())
    }
}

impl BinaryWriter for std::fs::File {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        io::Write::write_all(self, data)?;
        Ok(data.len())
    }
}

/// A fixed-width integer with a defined little-endian encoding.
pub trait LeScalar: Copy {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Append the little-endian encoding of `self` to `out`.
    fn encode_le(self, out: &mut Vec<u8>);

    /// Decode from exactly `Self::SIZE` little-endian bytes.
    fn decode_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_le_scalar {
    ($($ty:ty),*) => {
        $(impl LeScalar for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn encode_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn decode_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_le_bytes(buf)
            }
        })*
    };
}

impl_le_scalar!(u8, u16, u32, u64);

/// Write a single scalar.
pub fn write_scalar<T: LeScalar>(writer: &mut impl BinaryWriter, value: T) -> Result<usize> {
    let mut buf = Vec::with_capacity(T::SIZE);
    value.encode_le(&mut buf);
    Ok(writer.write(&buf)?)
}

/// Write a slice as a `u64` element count followed by the elements.
pub fn write_slice<T: LeScalar>(writer: &mut impl BinaryWriter, values: &[T]) -> Result<usize> {
    let mut buf = Vec::with_capacity(8 + values.len() * T::SIZE);
    (values.len() as u64).encode_le(&mut buf);
    for &v in values {
        v.encode_le(&mut buf);
    }
    Ok(writer.write(&buf)?)
}

/// Bounds-checked reader over a serialized byte buffer.
#[derive(Debug)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(GbdtError::serialization(format!(
                "unexpected end of input: need {} bytes at offset {}, have {}",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Read a single scalar.
    pub fn read_scalar<T: LeScalar>(&mut self) -> Result<T> {
        Ok(T::decode_le(self.take(T::SIZE)?))
    }

    /// Read a `u64`-length-prefixed vector of scalars.
    pub fn read_vec<T: LeScalar>(&mut self) -> Result<Vec<T>> {
        let len = self.read_scalar::<u64>()?;
        let len = usize::try_from(len)
            .map_err(|_| GbdtError::serialization(format!("vector length {} overflows", len)))?;
        let byte_len = len.checked_mul(T::SIZE).ok_or_else(|| {
            GbdtError::serialization(format!("vector length {} overflows", len))
        })?;
        let bytes = self.take(byte_len)?;
        let mut out = Vec::with_capacity(len);
        for chunk in bytes.chunks_exact(T::SIZE) {
            out.push(T::decode_le(chunk));
        }
        Ok(out)
    }
}
