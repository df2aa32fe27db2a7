//! Node-to-row-range bookkeeping shared by the host and device partitioners.

use crate::core::error::{GbdtError, Result};
use crate::core::types::{DataSize, NodeIndex};
use std::collections::HashMap;
use std::ops::Range;

/// Map from open tree node to its contiguous range in the shared index
/// array.
///
/// Invariant: ranges are disjoint, contiguous, and their union covers the
/// whole array exactly: no row is lost or duplicated, including mid-split.
#[derive(Debug, Clone)]
pub struct NodeRanges {
    map: HashMap<NodeIndex, Range<usize>>,
    n_rows: usize,
}

impl NodeRanges {
    /// Create with `root` owning the full range `0..n_rows`.
    pub fn new(root: NodeIndex, n_rows: usize) -> Self {
        let mut map = HashMap::new();
        map.insert(root, 0..n_rows);
        Self { map, n_rows }
    }

    /// Total number of rows covered.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of open nodes.
    pub fn n_nodes(&self) -> usize {
        self.map.len()
    }

    /// The range owned by `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not an open node; splitting or reading a node
    /// that was never created (or was already split) is a caller bug.
    pub fn range(&self, node: NodeIndex) -> Range<usize> {
        self.map
            .get(&node)
            .cloned()
            .unwrap_or_else(|| panic!("node {} does not own a row range", node))
    }

    /// Replace `parent`'s range with `left` owning its first `n_left` slots
    /// and `right` the rest.
    pub fn split(&mut self, parent: NodeIndex, left: NodeIndex, right: NodeIndex, n_left: usize) {
        let range = self.range(parent);
        assert!(
            n_left <= range.len(),
            "left count {} exceeds parent range length {}",
            n_left,
            range.len()
        );
        self.map.remove(&parent);
        self.map.insert(left, range.start..range.start + n_left);
        self.map.insert(right, range.start + n_left..range.end);
    }

    /// Iterate over (node, range) pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, Range<usize>)> + '_ {
        self.map.iter().map(|(&node, range)| (node, range.clone()))
    }

    /// Check the covering invariant; used by tests and debug assertions.
    pub fn validate(&self) -> Result<()> {
        let mut ranges: Vec<Range<usize>> = self.map.values().cloned().collect();
        // Empty ranges share their start with a sibling; sorting on the end
        // as well keeps the contiguity walk deterministic.
        ranges.sort_by_key(|r| (r.start, r.end));
        let mut expected_start = 0;
        for range in &ranges {
            if range.start != expected_start {
                return Err(GbdtError::internal(format!(
                    "row ranges leave a gap or overlap at {}",
                    expected_start
                )));
            }
            expected_start = range.end;
        }
        if expected_start != self.n_rows {
            return Err(GbdtError::internal(format!(
                "row ranges cover {} rows, expected {}",
                expected_start, self.n_rows
            )));
        }
        Ok(())
    }
}

/// The Node Index Partition: one flat array of row indices plus the node
/// range map. Created fresh per tree, mutated in place at each split,
/// discarded once the tree is finalized.
#[derive(Debug, Clone)]
pub struct RowSetCollection {
    row_indices: Vec<DataSize>,
    ranges: NodeRanges,
}

impl RowSetCollection {
    /// Create with `root` owning every row in ascending index order.
    pub fn new(root: NodeIndex, n_rows: usize) -> Self {
        Self {
            row_indices: (0..n_rows as DataSize).collect(),
            ranges: NodeRanges::new(root, n_rows),
        }
    }

    /// Total number of rows.
    pub fn n_rows(&self) -> usize {
        self.ranges.n_rows()
    }

    /// The node range map.
    pub fn ranges(&self) -> &NodeRanges {
        &self.ranges
    }

    /// Row indices currently owned by `node`.
    pub fn rows(&self, node: NodeIndex) -> &[DataSize] {
        &self.row_indices[self.ranges.range(node)]
    }

    /// Mutable view of `node`'s slots, for partitioning in place.
    pub(super) fn rows_mut(&mut self, node: NodeIndex) -> &mut [DataSize] {
        let range = self.ranges.range(node);
        &mut self.row_indices[range]
    }

    /// Record a completed split of `parent`.
    pub(super) fn apply_split(
        &mut self,
        parent: NodeIndex,
        left: NodeIndex,
        right: NodeIndex,
        n_left: usize,
    ) {
        self.ranges.split(parent, left, right, n_left);
        debug_assert!(self.ranges.validate().is_ok());
    }

    /// Flat per-row current-node snapshot.
    pub fn positions(&self) -> Vec<NodeIndex> {
        let mut out = vec![0 as NodeIndex; self.n_rows()];
        for (node, range) in self.ranges.iter() {
            for &row in &self.row_indices[range] {
                out[row as usize] = node;
            }
        }
        out
    }
}
