//! Shared low-level utilities for the parallel hot loops.

use std::cell::UnsafeCell;

/// A slice that can be written concurrently from multiple rayon workers.
///
/// The columnar build's all-dense fast path hands each worker a contiguous
/// row strip, but the destination cells of one strip are scattered across
/// every feature's column, so the buffer cannot be handed out via
/// `chunks_mut`. Callers must guarantee that no two workers ever write the
/// same index; with that invariant upheld, the writes are race-free.
pub(crate) struct SharedWriteSlice<'a, T> {
    slice: &'a [UnsafeCell<T>],
}

unsafe impl<T: Send + Sync> Sync for SharedWriteSlice<'_, T> {}

impl<'a, T> SharedWriteSlice<'a, T> {
    pub(crate) fn new(slice: &'a mut [T]) -> Self {
        let ptr = slice as *mut [T] as *const [UnsafeCell<T>];
        // SAFETY: UnsafeCell<T> has the same layout as T.
        Self {
            slice: unsafe { &*ptr },
        }
    }

    /// Write `value` at `idx`.
    ///
    /// # Safety
    ///
    /// No other worker may read or write `idx` for the lifetime of `self`.
    pub(crate) unsafe fn write(&self, idx: usize, value: T) {
        debug_assert!(idx < self.slice.len());
        unsafe { *self.slice[idx].get() = value };
    }
}

/// Split `slice` into consecutive sub-slices of the given lengths.
///
/// The lengths must sum to at most `slice.len()`; any remainder is dropped.
/// Used to hand each worker chunk its own disjoint destination window during
/// the scatter phase of a parallel split.
pub(crate) fn split_by_lengths<'a, T>(
    mut slice: &'a mut [T],
    lengths: &[usize],
) -> Vec<&'a mut [T]> {
    let mut out = Vec::with_capacity(lengths.len());
    for &len in lengths {
        let (head, tail) = slice.split_at_mut(len);
        out.push(head);
        slice = tail;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_shared_write_slice_disjoint_parallel_writes() {
        let mut data = vec![0u32; 256];
        {
            let shared = SharedWriteSlice::new(&mut data);
            (0..256usize).into_par_iter().for_each(|i| {
                // Each index written by exactly one task.
                unsafe { shared.write(i, i as u32 * 2) };
            });
        }
        for (i, &v) in data.iter().enumerate() {
            assert_eq!(v, i as u32 * 2);
        }
    }

    #[test]
    fn test_split_by_lengths() {
        let mut data = vec![1, 2, 3, 4, 5, 6];
        let parts = split_by_lengths(&mut data, &[2, 0, 3]);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], &[1, 2]);
        assert_eq!(parts[1], &[] as &[i32]);
        assert_eq!(parts[2], &[3, 4, 5]);
    }
}
