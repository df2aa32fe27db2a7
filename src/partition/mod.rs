//! Row partitioning engine: maintains which rows belong to which open tree
//! node while splits are applied.
//!
//! Two execution models implement the same logical operation with identical
//! observable results: [`RowPartitioner`] partitions node ranges in place on
//! the host worker pool; [`DevicePartitioner`] mirrors the accelerator
//! formulation (map, stable partition, buffer swap) over a ping-pong pair
//! of arena buffers. Both keep the partition order-stable within each side,
//! which downstream position-vector consumers rely on.

pub mod device;
pub mod host;
pub mod row_set;

pub use device::DevicePartitioner;
pub use host::RowPartitioner;
pub use row_set::{NodeRanges, RowSetCollection};

use crate::core::types::{DataSize, NodeIndex};

/// Evaluate the split predicate for one row, yielding `true` for the left
/// child.
///
/// An assignment to any node other than the two declared children is a
/// malformed split predicate, a caller bug, and terminates immediately
/// rather than producing a silently wrong partition.
#[inline]
pub(crate) fn goes_left<F>(row: DataSize, left: NodeIndex, right: NodeIndex, assign: &F) -> bool
where
    F: Fn(DataSize) -> NodeIndex,
{
    let node = assign(row);
    if node == left {
        true
    } else if node == right {
        false
    } else {
        panic!(
            "split assignment for row {} returned node {}, expected child {} or {}",
            row, node, left, right
        );
    }
}
