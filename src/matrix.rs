//! Globally quantized bin matrix: the row-major input the columnar store is
//! built from.
//!
//! Each training instance contributes a run of (feature, global bin) entries
//! for its non-missing values, features strictly increasing within a row.
//! The cut pointers delimit each feature's global bin range: feature `f`
//! owns bins `[cut_ptrs[f], cut_ptrs[f + 1])`. Quantization itself (choosing
//! the thresholds behind the cut pointers) happens upstream; this type only
//! carries and validates its output.

use crate::core::constants::MAX_NUM_ROWS;
use crate::core::error::{GbdtError, Result};
use crate::core::types::{BinIndex, FeatureIndex};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// One present (feature, value) pair of a row, value already mapped to its
/// global bin id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Feature index.
    pub feature: u32,
    /// Global bin id, inside the feature's cut range.
    pub bin: BinIndex,
}

/// Row-major quantized bin matrix in CSR form. Immutable for the duration of
/// tree construction on a shard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantizedMatrix {
    cut_ptrs: Vec<BinIndex>,
    row_ptr: Vec<usize>,
    entries: Vec<Entry>,
}

impl QuantizedMatrix {
    /// Assemble a matrix from its CSR parts, validating shape consistency.
    ///
    /// Returns a [`GbdtError::DataShape`] error if the row pointers are not
    /// monotone, a row's features are not strictly increasing, or any bin id
    /// falls outside its feature's cut range.
    pub fn new(cut_ptrs: Vec<BinIndex>, row_ptr: Vec<usize>, entries: Vec<Entry>) -> Result<Self> {
        if cut_ptrs.is_empty() {
            return Err(GbdtError::data_shape("cut_ptrs must have length n_features + 1"));
        }
        if cut_ptrs.windows(2).any(|w| w[0] > w[1]) {
            return Err(GbdtError::data_shape("cut_ptrs must be non-decreasing"));
        }
        if row_ptr.first() != Some(&0) || row_ptr.last() != Some(&entries.len()) {
            return Err(GbdtError::data_shape(format!(
                "row_ptr must start at 0 and end at the entry count {}",
                entries.len()
            )));
        }
        if row_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(GbdtError::data_shape("row_ptr must be non-decreasing"));
        }
        let n_rows = row_ptr.len() - 1;
        if n_rows > MAX_NUM_ROWS {
            return Err(GbdtError::data_shape(format!(
                "row count {} exceeds the supported maximum {}",
                n_rows, MAX_NUM_ROWS
            )));
        }
        let n_features = cut_ptrs.len() - 1;
        for rid in 0..n_rows {
            let row = &entries[row_ptr[rid]..row_ptr[rid + 1]];
            let mut prev_feature: Option<u32> = None;
            for entry in row {
                let fid = entry.feature as usize;
                if fid >= n_features {
                    return Err(GbdtError::data_shape(format!(
                        "row {}: feature {} out of range ({} features)",
                        rid, fid, n_features
                    )));
                }
                if prev_feature.is_some_and(|prev| prev >= entry.feature) {
                    return Err(GbdtError::data_shape(format!(
                        "row {}: features must be strictly increasing",
                        rid
                    )));
                }
                prev_feature = Some(entry.feature);
                if entry.bin < cut_ptrs[fid] || entry.bin >= cut_ptrs[fid + 1] {
                    return Err(GbdtError::data_shape(format!(
                        "row {}: bin {} outside feature {}'s range [{}, {})",
                        rid, entry.bin, fid, cut_ptrs[fid], cut_ptrs[fid + 1]
                    )));
                }
            }
        }
        Ok(Self {
            cut_ptrs,
            row_ptr,
            entries,
        })
    }

    /// Build a fully dense matrix from a rows-by-features array of global
    /// bin ids. Every value is treated as present.
    pub fn from_dense(bins: ArrayView2<'_, BinIndex>, cut_ptrs: Vec<BinIndex>) -> Result<Self> {
        let (n_rows, n_features) = bins.dim();
        if cut_ptrs.len() != n_features + 1 {
            return Err(GbdtError::data_shape(format!(
                "cut_ptrs has length {}, expected {} for {} features",
                cut_ptrs.len(),
                n_features + 1,
                n_features
            )));
        }
        let mut entries = Vec::with_capacity(n_rows * n_features);
        let mut row_ptr = Vec::with_capacity(n_rows + 1);
        row_ptr.push(0);
        for row in bins.rows() {
            for (fid, &bin) in row.iter().enumerate() {
                entries.push(Entry {
                    feature: fid as u32,
                    bin,
                });
            }
            row_ptr.push(entries.len());
        }
        Self::new(cut_ptrs, row_ptr, entries)
    }

    /// Number of rows (training instances).
    pub fn n_rows(&self) -> usize {
        self.row_ptr.len() - 1
    }

    /// Number of features.
    pub fn n_features(&self) -> usize {
        self.cut_ptrs.len() - 1
    }

    /// Total number of present entries.
    pub fn n_entries(&self) -> usize {
        self.entries.len()
    }

    /// Per-feature global bin-range boundaries, length `n_features + 1`.
    pub fn cut_ptrs(&self) -> &[BinIndex] {
        &self.cut_ptrs
    }

    /// The present entries of one row, features strictly increasing.
    pub fn row(&self, rid: usize) -> &[Entry] {
        &self.entries[self.row_ptr[rid]..self.row_ptr[rid + 1]]
    }

    /// Number of bins owned by one feature.
    pub fn n_bins(&self, fid: FeatureIndex) -> usize {
        (self.cut_ptrs[fid + 1] - self.cut_ptrs[fid]) as usize
    }

    /// Largest per-feature bin count; determines the stored bin-id width.
    pub fn max_bins_per_feature(&self) -> usize {
        (0..self.n_features()).map(|f| self.n_bins(f)).max().unwrap_or(0)
    }

    /// Count of present (non-missing) entries per feature.
    pub fn feature_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_features()];
        for entry in &self.entries {
            counts[entry.feature as usize] += 1;
        }
        counts
    }

    /// Whether every (row, feature) cell is present.
    pub fn is_dense(&self) -> bool {
        self.entries.len() == self.n_rows() * self.n_features()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_dense() {
        let bins = array![[0u32, 3], [1, 4], [2, 5]];
        let matrix = QuantizedMatrix::from_dense(bins.view(), vec![0, 3, 6]).unwrap();
        assert_eq!(matrix.n_rows(), 3);
        assert_eq!(matrix.n_features(), 2);
        assert!(matrix.is_dense());
        assert_eq!(matrix.feature_counts(), vec![3, 3]);
        assert_eq!(matrix.max_bins_per_feature(), 3);
        assert_eq!(matrix.row(1), &[
            Entry { feature: 0, bin: 1 },
            Entry { feature: 1, bin: 4 },
        ]);
    }

    #[test]
    fn test_sparse_rows() {
        // Row 1 is missing feature 0; row 2 is entirely missing.
        let entries = vec![
            Entry { feature: 0, bin: 0 },
            Entry { feature: 1, bin: 2 },
            Entry { feature: 1, bin: 3 },
        ];
        let matrix = QuantizedMatrix::new(vec![0, 2, 4], vec![0, 2, 3, 3], entries).unwrap();
        assert_eq!(matrix.n_rows(), 3);
        assert!(!matrix.is_dense());
        assert_eq!(matrix.feature_counts(), vec![1, 2]);
        assert!(matrix.row(2).is_empty());
    }

    #[test]
    fn test_rejects_bin_outside_cut_range() {
        let entries = vec![Entry { feature: 0, bin: 2 }];
        let err = QuantizedMatrix::new(vec![0, 2, 4], vec![0, 1], entries).unwrap_err();
        assert!(err.to_string().contains("outside feature"));
    }

    #[test]
    fn test_rejects_unsorted_features() {
        let entries = vec![
            Entry { feature: 1, bin: 2 },
            Entry { feature: 0, bin: 0 },
        ];
        assert!(QuantizedMatrix::new(vec![0, 2, 4], vec![0, 2], entries).is_err());
    }

    #[test]
    fn test_rejects_bad_row_ptr() {
        assert!(QuantizedMatrix::new(vec![0, 2], vec![0, 5], vec![]).is_err());
        assert!(QuantizedMatrix::new(vec![0, 2], vec![1, 0], vec![]).is_err());
    }
}
