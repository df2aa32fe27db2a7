//! Host-path row partitioner.

use super::row_set::RowSetCollection;
use super::goes_left;
use crate::core::constants::{EXCLUDED_POSITION, MIN_CHUNK_SIZE, MIN_ROWS_TO_PARALLELIZE};
use crate::core::types::{DataSize, NodeIndex, Position};
use crate::core::utils::split_by_lengths;
use rayon::prelude::*;

/// Partitions row indices across open tree nodes on the host worker pool.
///
/// Owns one flat index array (each open node a contiguous range) plus two
/// scratch buffers used during splits. Created fresh per tree; splits must
/// be serialized per instance, since the scratch buffers are shared across
/// calls.
/// Readers of [`RowPartitioner::rows`] are safe once no split is in flight.
#[derive(Debug)]
pub struct RowPartitioner {
    rows: RowSetCollection,
    left_buffer: Vec<DataSize>,
    right_buffer: Vec<DataSize>,
}

impl RowPartitioner {
    /// Root node id used by [`RowPartitioner::new`].
    pub const ROOT: NodeIndex = 0;

    /// Create a partitioner with node [`Self::ROOT`] owning all `n_rows`
    /// rows in ascending index order.
    pub fn new(n_rows: usize) -> Self {
        Self {
            rows: RowSetCollection::new(Self::ROOT, n_rows),
            left_buffer: vec![0; n_rows],
            right_buffer: vec![0; n_rows],
        }
    }

    /// Total number of rows.
    pub fn n_rows(&self) -> usize {
        self.rows.n_rows()
    }

    /// Number of currently open nodes.
    pub fn n_nodes(&self) -> usize {
        self.rows.ranges().n_nodes()
    }

    /// Row indices currently owned by `node`, in partition order.
    pub fn rows(&self, node: NodeIndex) -> &[DataSize] {
        self.rows.rows(node)
    }

    /// Flat per-row snapshot of current node assignment.
    pub fn positions(&self) -> Vec<NodeIndex> {
        self.rows.positions()
    }

    /// Split `parent` into `left` and `right` according to `assign`.
    ///
    /// `assign` is evaluated exactly once per row owned by `parent` and must
    /// return one of the two child ids. The parent's range is partitioned
    /// stably: rows sent left keep their relative order as the new left
    /// range, likewise for the right. Returns `(n_left, n_right)`.
    ///
    /// # Panics
    ///
    /// Panics if `assign` returns a node id that is neither `left` nor
    /// `right`, or if `parent` is not an open node.
    pub fn split<F>(
        &mut self,
        parent: NodeIndex,
        left: NodeIndex,
        right: NodeIndex,
        assign: F,
    ) -> (usize, usize)
    where
        F: Fn(DataSize) -> NodeIndex + Sync,
    {
        let slice = self.rows.rows_mut(parent);
        let len = slice.len();
        let left_buf = &mut self.left_buffer[..len];
        let right_buf = &mut self.right_buffer[..len];

        let n_left = if len <= MIN_ROWS_TO_PARALLELIZE {
            split_serial(slice, left_buf, right_buf, left, right, &assign)
        } else {
            split_parallel(slice, left_buf, right_buf, left, right, &assign)
        };

        self.rows.apply_split(parent, left, right, n_left);
        log::trace!(
            "split node {}: {} rows -> node {} ({}) / node {} ({})",
            parent,
            len,
            left,
            n_left,
            right,
            len - n_left
        );
        (n_left, len - n_left)
    }

    /// Compute every row's definitive node id once tree growth stops.
    ///
    /// Rows for which `filter` is true receive [`EXCLUDED_POSITION`]
    /// regardless of `assign`; all others get `assign(row, current_node)`,
    /// letting leaf-specific postprocessing run in the same pass.
    pub fn finalize<A, F>(&self, assign: A, filter: F) -> Vec<Position>
    where
        A: Fn(DataSize, NodeIndex) -> Position,
        F: Fn(DataSize) -> bool,
    {
        let mut out = vec![0 as Position; self.n_rows()];
        for (node, _) in self.rows.ranges().iter() {
            for &row in self.rows.rows(node) {
                out[row as usize] = if filter(row) {
                    EXCLUDED_POSITION
                } else {
                    assign(row, node)
                };
            }
        }
        out
    }
}

/// Stable two-way partition through the scratch buffers, single thread.
fn split_serial<F>(
    slice: &mut [DataSize],
    left_buf: &mut [DataSize],
    right_buf: &mut [DataSize],
    left: NodeIndex,
    right: NodeIndex,
    assign: &F,
) -> usize
where
    F: Fn(DataSize) -> NodeIndex,
{
    let mut n_left = 0;
    let mut n_right = 0;
    for &row in slice.iter() {
        if goes_left(row, left, right, assign) {
            left_buf[n_left] = row;
            n_left += 1;
        } else {
            right_buf[n_right] = row;
            n_right += 1;
        }
    }
    slice[..n_left].copy_from_slice(&left_buf[..n_left]);
    slice[n_left..].copy_from_slice(&right_buf[..n_right]);
    n_left
}

/// Stable two-way partition over row chunks: a counting pass writes each
/// chunk's left/right rows into the scratch buffers, then a scatter pass
/// copies them to output offsets computed by prefix sum. No shared mutable
/// counters exist in either pass.
fn split_parallel<F>(
    slice: &mut [DataSize],
    left_buf: &mut [DataSize],
    right_buf: &mut [DataSize],
    left: NodeIndex,
    right: NodeIndex,
    assign: &F,
) -> usize
where
    F: Fn(DataSize) -> NodeIndex + Sync,
{
    let chunk_size = (slice.len() / rayon::current_num_threads()).max(MIN_CHUNK_SIZE);
    let counts: Vec<(usize, usize)> = (
        slice.par_chunks(chunk_size),
        left_buf.par_chunks_mut(chunk_size),
        right_buf.par_chunks_mut(chunk_size),
    )
        .into_par_iter()
        .map(|(src, chunk_left, chunk_right)| {
            let mut n_left = 0;
            let mut n_right = 0;
            for &row in src {
                if goes_left(row, left, right, assign) {
                    chunk_left[n_left] = row;
                    n_left += 1;
                } else {
                    chunk_right[n_right] = row;
                    n_right += 1;
                }
            }
            (n_left, n_right)
        })
        .collect();

    let left_lens: Vec<usize> = counts.iter().map(|c| c.0).collect();
    let right_lens: Vec<usize> = counts.iter().map(|c| c.1).collect();
    let n_left: usize = left_lens.iter().sum();

    let (left_dst, right_dst) = slice.split_at_mut(n_left);
    let left_parts = split_by_lengths(left_dst, &left_lens);
    let right_parts = split_by_lengths(right_dst, &right_lens);
    let left_src = &left_buf[..];
    let right_src = &right_buf[..];
    (
        left_parts,
        right_parts,
        left_src.par_chunks(chunk_size),
        right_src.par_chunks(chunk_size),
    )
        .into_par_iter()
        .for_each(|(dst_left, dst_right, src_left, src_right)| {
            dst_left.copy_from_slice(&src_left[..dst_left.len()]);
            dst_right.copy_from_slice(&src_right[..dst_right.len()]);
        });
    n_left
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_preserves_order_and_rows() {
        let mut partitioner = RowPartitioner::new(10);
        let (n_left, n_right) = partitioner.split(0, 1, 2, |row| if row % 3 == 0 { 1 } else { 2 });
        assert_eq!(n_left, 4);
        assert_eq!(n_right, 6);
        assert_eq!(partitioner.rows(1), &[0, 3, 6, 9]);
        assert_eq!(partitioner.rows(2), &[1, 2, 4, 5, 7, 8]);
    }

    #[test]
    fn test_empty_side() {
        let mut partitioner = RowPartitioner::new(4);
        let (n_left, n_right) = partitioner.split(0, 1, 2, |_| 2);
        assert_eq!((n_left, n_right), (0, 4));
        assert!(partitioner.rows(1).is_empty());
        assert_eq!(partitioner.rows(2), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_repeated_empty_side_splits() {
        // Every split sends all rows one way; the range bookkeeping must
        // stay valid with empty children stacked at the same offset.
        let mut partitioner = RowPartitioner::new(6);
        partitioner.split(0, 1, 2, |_| 2);
        partitioner.split(2, 3, 4, |_| 3);
        partitioner.split(3, 5, 6, |row| if row < 3 { 5 } else { 6 });
        assert!(partitioner.rows(1).is_empty());
        assert!(partitioner.rows(4).is_empty());
        assert_eq!(partitioner.rows(5), &[0, 1, 2]);
        assert_eq!(partitioner.rows(6), &[3, 4, 5]);
        assert_eq!(partitioner.positions(), vec![5, 5, 5, 6, 6, 6]);
    }

    #[test]
    fn test_parallel_path_matches_serial() {
        let n = MIN_ROWS_TO_PARALLELIZE * 4 + 37;
        let assign =
            |row: DataSize| if row.wrapping_mul(2654435761) % 5 < 2 { 1 } else { 2 };

        let mut big = RowPartitioner::new(n);
        big.split(0, 1, 2, assign);

        // Reference: the serial algorithm over the same rows.
        let all: Vec<DataSize> = (0..n as DataSize).collect();
        let expected_left: Vec<DataSize> =
            all.iter().copied().filter(|&r| assign(r) == 1).collect();
        let expected_right: Vec<DataSize> =
            all.iter().copied().filter(|&r| assign(r) == 2).collect();
        assert_eq!(big.rows(1), expected_left.as_slice());
        assert_eq!(big.rows(2), expected_right.as_slice());
    }

    #[test]
    #[should_panic(expected = "expected child")]
    fn test_invalid_child_id_panics() {
        let mut partitioner = RowPartitioner::new(8);
        partitioner.split(0, 1, 2, |row| if row == 5 { 99 } else { 1 });
    }

    #[test]
    fn test_finalize_filter_wins() {
        let mut partitioner = RowPartitioner::new(6);
        partitioner.split(0, 1, 2, |row| if row < 3 { 1 } else { 2 });
        let positions = partitioner.finalize(|_, node| node as Position, |row| row % 2 == 0);
        assert_eq!(positions, vec![-1, 1, -1, 2, -1, 2]);
    }
}
