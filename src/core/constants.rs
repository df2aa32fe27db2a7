//! System constants and default configuration values.

use crate::core::types::{DataSize, Position};

/// Default sparsity threshold for column classification.
///
/// A feature whose non-missing count is below `threshold * n_rows` is stored
/// as a sparse column.
pub const DEFAULT_SPARSE_THRESHOLD: f64 = 0.2;

/// Sentinel node id assigned by `finalize` to rows excluded by the filter
/// predicate (e.g. sampled-out, zero-weight instances).
pub const EXCLUDED_POSITION: Position = -1;

/// Below this many rows a split is partitioned serially; the bookkeeping of
/// the chunked parallel path costs more than it saves.
pub const MIN_ROWS_TO_PARALLELIZE: usize = 1024;

/// Minimum rows per worker chunk in the parallel split and build paths.
pub const MIN_CHUNK_SIZE: usize = 1024;

/// Largest row count representable by [`DataSize`].
pub const MAX_NUM_ROWS: usize = DataSize::MAX as usize;
