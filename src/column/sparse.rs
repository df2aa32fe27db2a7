//! Sparse column view: (row index, bin id) pairs for present rows only.

use super::BinIdx;
use crate::core::types::{BinIndex, DataSize};

/// Read-only view of a sparse column.
///
/// Lookup is cursor-based and monotonic: a cursor is only valid for a
/// non-decreasing sequence of row indices, which is exactly how histogram
/// accumulation walks a node's row range. Each reader owns its cursor, so
/// concurrent readers never share state.
#[derive(Debug)]
pub struct SparseColumn<'a, T> {
    index: &'a [T],
    row_ind: &'a [DataSize],
    index_base: BinIndex,
}

impl<'a, T: BinIdx> SparseColumn<'a, T> {
    pub(super) fn new(index: &'a [T], row_ind: &'a [DataSize], index_base: BinIndex) -> Self {
        debug_assert_eq!(index.len(), row_ind.len());
        debug_assert!(row_ind.windows(2).all(|w| w[0] < w[1]));
        Self {
            index,
            row_ind,
            index_base,
        }
    }

    /// Number of present entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the column has no present entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The feature's least global bin id.
    pub fn base_idx(&self) -> BinIndex {
        self.index_base
    }

    /// Row index of the `i`-th present entry.
    pub fn row_idx(&self, i: usize) -> DataSize {
        self.row_ind[i]
    }

    /// Global bin id of the `i`-th present entry.
    pub fn global_bin_at(&self, i: usize) -> BinIndex {
        self.index_base + self.index[i].to_u32()
    }

    /// Cursor positioned at the first entry with row index `>= first_row`.
    /// Use when a node's row range does not start at row 0.
    pub fn initial_cursor(&self, first_row: DataSize) -> usize {
        self.row_ind.partition_point(|&r| r < first_row)
    }

    /// Global bin id for `row`, or `None` if the row is absent from this
    /// column. Advances `cursor`; `row` must be non-decreasing across calls
    /// with the same cursor.
    pub fn bin_idx(&self, row: DataSize, cursor: &mut usize) -> Option<BinIndex> {
        while *cursor < self.len() && self.row_ind[*cursor] < row {
            *cursor += 1;
        }
        if *cursor < self.len() && self.row_ind[*cursor] == row {
            Some(self.global_bin_at(*cursor))
        } else {
            None
        }
    }
}
