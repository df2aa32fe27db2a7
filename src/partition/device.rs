//! Accelerator-model row partitioner.
//!
//! Mirrors the massively parallel formulation of the split: a map kernel
//! computes each row's destination side into an auxiliary flag buffer, a
//! scan-based stable-partition kernel materializes the left-prefix /
//! right-suffix layout into the inactive arena buffer (carrying every range
//! outside the parent through unchanged), and the final step is an O(1)
//! flip of the active-buffer index, never a copy. The three phases are
//! dependent and run back to back per split; the partitioned layout is
//! bit-identical to the host path's.
//!
//! The kernels here execute on the rayon pool. The structure (explicit
//! side buffer, blocked count + prefix-sum + scatter, ping-pong arenas with
//! an external "current" index) is the accelerator algorithm, independent
//! of what launches the blocks.

use super::goes_left;
use super::row_set::NodeRanges;
use crate::core::constants::{EXCLUDED_POSITION, MIN_CHUNK_SIZE};
use crate::core::types::{DataSize, NodeIndex, Position};
use crate::core::utils::split_by_lengths;
use rayon::prelude::*;

const SIDE_LEFT: u8 = 0;
const SIDE_RIGHT: u8 = 1;

/// Which of the two arena buffers currently holds the partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveBuffer {
    A,
    B,
}

impl ActiveBuffer {
    fn index(self) -> usize {
        match self {
            ActiveBuffer::A => 0,
            ActiveBuffer::B => 1,
        }
    }

    fn flipped(self) -> Self {
        match self {
            ActiveBuffer::A => ActiveBuffer::B,
            ActiveBuffer::B => ActiveBuffer::A,
        }
    }
}

/// Row partitioner in the accelerator execution model.
///
/// Holds two equally sized arena buffers and an explicit active index; one
/// logical stream per instance, so splits are serialized per partitioner.
#[derive(Debug)]
pub struct DevicePartitioner {
    buffers: [Vec<DataSize>; 2],
    active: ActiveBuffer,
    side_flags: Vec<u8>,
    ranges: NodeRanges,
}

impl DevicePartitioner {
    /// Root node id used by [`DevicePartitioner::new`].
    pub const ROOT: NodeIndex = 0;

    /// Create a partitioner with node [`Self::ROOT`] owning all `n_rows`
    /// rows in ascending index order.
    pub fn new(n_rows: usize) -> Self {
        Self {
            buffers: [(0..n_rows as DataSize).collect(), vec![0; n_rows]],
            active: ActiveBuffer::A,
            side_flags: vec![0; n_rows],
            ranges: NodeRanges::new(Self::ROOT, n_rows),
        }
    }

    /// Total number of rows.
    pub fn n_rows(&self) -> usize {
        self.ranges.n_rows()
    }

    /// Number of currently open nodes.
    pub fn n_nodes(&self) -> usize {
        self.ranges.n_nodes()
    }

    /// Row indices currently owned by `node`, borrowed from the active
    /// arena buffer.
    pub fn rows(&self, node: NodeIndex) -> &[DataSize] {
        &self.buffers[self.active.index()][self.ranges.range(node)]
    }

    /// Row indices currently owned by `node`, materialized as an owned
    /// host-side copy.
    pub fn rows_host(&self, node: NodeIndex) -> Vec<DataSize> {
        self.rows(node).to_vec()
    }

    /// Flat per-row snapshot of current node assignment.
    pub fn positions(&self) -> Vec<NodeIndex> {
        let active = &self.buffers[self.active.index()];
        let mut out = vec![0 as NodeIndex; self.n_rows()];
        for (node, range) in self.ranges.iter() {
            for &row in &active[range] {
                out[row as usize] = node;
            }
        }
        out
    }

    /// Split `parent` into `left` and `right` according to `assign`.
    ///
    /// Same contract and same resulting layout as
    /// [`crate::partition::RowPartitioner::split`]; see the module docs for
    /// the three-phase structure. Returns `(n_left, n_right)`.
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
        let range = self.ranges.range(parent);
        let len = range.len();

        // Phase 1: map each row of the parent range to its side.
        {
            let src = &self.buffers[self.active.index()][range.clone()];
            let flags = &mut self.side_flags[range.clone()];
            src.par_iter().zip(flags.par_iter_mut()).for_each(|(&row, flag)| {
                *flag = if goes_left(row, left, right, &assign) {
                    SIDE_LEFT
                } else {
                    SIDE_RIGHT
                };
            });
        }

        // Phase 2: stable partition into the inactive buffer. Ranges owned
        // by other nodes pass through unchanged so the whole array stays
        // valid after the swap.
        let (head, tail) = self.buffers.split_at_mut(1);
        let (src_buf, dst_buf): (&[DataSize], &mut [DataSize]) = match self.active {
            ActiveBuffer::A => (&head[0], &mut tail[0]),
            ActiveBuffer::B => (&tail[0], &mut head[0]),
        };
        dst_buf[..range.start].copy_from_slice(&src_buf[..range.start]);
        dst_buf[range.end..].copy_from_slice(&src_buf[range.end..]);

        let src = &src_buf[range.clone()];
        let flags = &self.side_flags[range.clone()];
        let chunk_size = (len / rayon::current_num_threads().max(1)).max(MIN_CHUNK_SIZE);
        let counts: Vec<(usize, usize)> = src
            .par_chunks(chunk_size)
            .zip(flags.par_chunks(chunk_size))
            .map(|(_, chunk_flags)| {
                let n_left = chunk_flags.iter().filter(|&&f| f == SIDE_LEFT).count();
                (n_left, chunk_flags.len() - n_left)
            })
            .collect();
        let left_lens: Vec<usize> = counts.iter().map(|c| c.0).collect();
        let right_lens: Vec<usize> = counts.iter().map(|c| c.1).collect();
        let n_left: usize = left_lens.iter().sum();

        let dst = &mut dst_buf[range.clone()];
        let (dst_left, dst_right) = dst.split_at_mut(n_left);
        let left_parts = split_by_lengths(dst_left, &left_lens);
        let right_parts = split_by_lengths(dst_right, &right_lens);
        (
            left_parts,
            right_parts,
            src.par_chunks(chunk_size),
            flags.par_chunks(chunk_size),
        )
            .into_par_iter()
            .for_each(|(part_left, part_right, src_chunk, flag_chunk)| {
                let mut n_left = 0;
                let mut n_right = 0;
                for (&row, &flag) in src_chunk.iter().zip(flag_chunk) {
                    if flag == SIDE_LEFT {
                        part_left[n_left] = row;
                        n_left += 1;
                    } else {
                        part_right[n_right] = row;
                        n_right += 1;
                    }
                }
            });

        // Phase 3: the freshly written buffer becomes current.
        self.active = self.active.flipped();
        self.ranges.split(parent, left, right, n_left);
        log::trace!(
            "device split node {}: {} rows -> node {} ({}) / node {} ({})",
            parent,
            len,
            left,
            n_left,
            right,
            len - n_left
        );
        (n_left, len - n_left)
    }

    /// Compute every row's definitive node id once tree growth stops; same
    /// contract as [`crate::partition::RowPartitioner::finalize`].
    pub fn finalize<A, F>(&self, assign: A, filter: F) -> Vec<Position>
    where
        A: Fn(DataSize, NodeIndex) -> Position,
        F: Fn(DataSize) -> bool,
    {
        let active = &self.buffers[self.active.index()];
        let mut out = vec![0 as Position; self.n_rows()];
        for (node, range) in self.ranges.iter() {
            for &row in &active[range] {
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
