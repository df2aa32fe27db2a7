//! Binary I/O plumbing for serialized stores.

pub mod codec;

pub use codec::{BinaryWriter, ByteReader, VecBinaryWriter};
