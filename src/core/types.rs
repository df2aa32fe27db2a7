//! Core data types shared by the columnar bin store and the row partitioner.
//!
//! The aliases keep the on-disk and in-memory integer widths in one place;
//! the serialized store format depends on them, so they are pinned with
//! compile-time assertions.

use static_assertions::const_assert_eq;

/// Row (training instance) index. 32-bit, supporting up to 4 billion rows
/// per shard.
pub type DataSize = u32;

/// Global bin id in `[0, total_bins)` across all features.
pub type BinIndex = u32;

/// Feature index within the dataset.
pub type FeatureIndex = usize;

/// Identifier of an open tree node during growth.
pub type NodeIndex = u32;

/// Finalized per-instance node id. Negative values mark instances excluded
/// from leaf statistics (see [`crate::core::constants::EXCLUDED_POSITION`]).
pub type Position = i32;

// The serialized column store encodes row indices and bin ids with these
// exact widths.
const_assert_eq!(std::mem::size_of::<DataSize>(), 4);
const_assert_eq!(std::mem::size_of::<BinIndex>(), 4);
const_assert_eq!(std::mem::size_of::<Position>(), 4);
