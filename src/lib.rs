//! # GBDT Core
//!
//! The data-layout core of a histogram-based gradient boosting trainer:
//! a compressed columnar bin store and a row partitioner, the two structures
//! every histogram build and split application runs on.
//!
//! ## Features
//!
//! - **Columnar Bin Store**: Per-feature dense or sparse columns over one
//!   shared buffer, with a global 1/2/4-byte bin width, relative bin ids,
//!   and an optional missing bitmap.
//! - **Row Partitioner**: Contiguous per-node row ranges over one flat index
//!   array, split stably into a left prefix and right suffix, with a
//!   finalization pass producing the per-row position vector.
//! - **Two Execution Models**: A host-pool partitioner working in place and
//!   an accelerator-style partitioner over ping-pong buffers, with identical
//!   observable results.
//! - **Binary Serialization**: Byte-order-independent persistence of the
//!   column store for cached or distributed training setups.
//!
//! ## Quick Start
//!
//! ```rust
//! use gbdt_core::{ColumnStore, QuantizedMatrix, RowPartitioner};
//! use ndarray::array;
//!
//! # fn main() -> gbdt_core::Result<()> {
//! // Quantized bins for 4 rows and 2 features, with per-feature cut
//! // pointers [0, 3, 6]: feature 0 owns global bins 0..3, feature 1 owns
//! // 3..6.
//! let bins = array![[0u32, 3], [1, 4], [2, 5], [0, 3]];
//! let matrix = QuantizedMatrix::from_dense(bins.view(), vec![0, 3, 6])?;
//! let store = ColumnStore::build(&matrix, 0.2, 0)?;
//! assert!(!store.any_missing());
//!
//! // Partition rows as a tree grows.
//! let mut partitioner = RowPartitioner::new(matrix.n_rows());
//! partitioner.split(RowPartitioner::ROOT, 1, 2, |row| if row < 2 { 1 } else { 2 });
//! assert_eq!(partitioner.rows(1), &[0, 1]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    non_snake_case,
    non_upper_case_globals
)]

// Core infrastructure - types, constants, errors, shared utilities
pub mod core;

// Quantized input matrix (CSR over bin entries)
pub mod matrix;

// Columnar bin store
pub mod column;

// Binary persistence plumbing
pub mod io;

// Row partitioning engine
pub mod partition;

// Re-export the working surface at the crate root
pub use column::{
    BinBuffer, BinIdx, BinWidth, Column, ColumnStore, ColumnType, DenseColumn, MissingFlags,
    SparseColumn,
};
pub use crate::core::constants::{DEFAULT_SPARSE_THRESHOLD, EXCLUDED_POSITION, MAX_NUM_ROWS};
pub use crate::core::error::{GbdtError, Result};
pub use crate::core::types::{BinIndex, DataSize, FeatureIndex, NodeIndex, Position};
pub use io::{BinaryWriter, ByteReader, VecBinaryWriter};
pub use matrix::{Entry, QuantizedMatrix};
pub use partition::{DevicePartitioner, NodeRanges, RowPartitioner, RowSetCollection};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize library-wide facilities.
///
/// Sets up `env_logger` so `RUST_LOG` controls log output; safe to call more
/// than once, later calls are no-ops.
pub fn init() {
    let _ = env_logger::try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
    }

    #[test]
    fn test_version_string() {
        assert!(!VERSION.is_empty());
    }
}
