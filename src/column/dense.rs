//! Dense column view: one bin id per row.

use super::{BinIdx, MissingFlags};
use crate::core::types::{BinIndex, DataSize};

/// Read-only view of a dense column.
///
/// Stored ids are relative to the feature's base (`global - base`); lookup
/// is O(1) by row index. When `ANY_MISSING` is false the missing bitmap is
/// absent and every row is present, which lets the per-row check compile
/// away entirely on fully dense datasets.
#[derive(Debug)]
pub struct DenseColumn<'a, T, const ANY_MISSING: bool> {
    index: &'a [T],
    index_base: BinIndex,
    /// Global missing bitmap and this feature's offset into it. `Some` iff
    /// `ANY_MISSING`.
    missing: Option<(&'a MissingFlags, usize)>,
}

impl<'a, T: BinIdx, const ANY_MISSING: bool> DenseColumn<'a, T, ANY_MISSING> {
    pub(super) fn new(
        index: &'a [T],
        index_base: BinIndex,
        missing: Option<(&'a MissingFlags, usize)>,
    ) -> Self {
        debug_assert_eq!(missing.is_some(), ANY_MISSING);
        Self {
            index,
            index_base,
            missing,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The feature's least global bin id.
    pub fn base_idx(&self) -> BinIndex {
        self.index_base
    }

    /// Raw stored (relative) bin id for `row`. Meaningless if the row is
    /// missing.
    pub fn feature_bin(&self, row: DataSize) -> T {
        self.index[row as usize]
    }

    /// Global bin id for `row`, ignoring missingness.
    pub fn global_bin(&self, row: DataSize) -> BinIndex {
        self.index_base + self.index[row as usize].to_u32()
    }

    /// Whether `row`'s value is missing.
    pub fn is_missing(&self, row: DataSize) -> bool {
        if ANY_MISSING {
            let (flags, offset) = self.missing.expect("missing bitmap absent");
            flags.get(offset + row as usize)
        } else {
            false
        }
    }

    /// Global bin id for `row`, or `None` if the value is missing.
    pub fn bin_idx(&self, row: DataSize) -> Option<BinIndex> {
        if self.is_missing(row) {
            None
        } else {
            Some(self.global_bin(row))
        }
    }
}
