//! Construction and access for the columnar bin store.

use super::{BinBuffer, BinIdx, BinWidth, Column, ColumnType, DenseColumn, MissingFlags, SparseColumn};
use crate::core::constants::MIN_CHUNK_SIZE;
use crate::core::error::Result;
use crate::core::types::{BinIndex, DataSize, FeatureIndex};
use crate::core::utils::SharedWriteSlice;
use crate::matrix::QuantizedMatrix;
use rayon::prelude::*;

/// Compressed columnar representation of a quantized bin matrix.
///
/// Built once per dataset (or shard) before tree growth starts; read-only
/// afterwards and safe to share across any number of concurrent readers.
/// Each feature's column is classified dense or sparse from its observed
/// non-missing ratio, every stored id is relative to the feature's base bin,
/// and all columns share one flat buffer at a single [`BinWidth`].
#[derive(Debug, Clone)]
pub struct ColumnStore {
    /// All columns' bin ids, back to back, element-indexed by
    /// `feature_offsets`.
    pub(super) bins: BinBuffer,
    /// Per-feature count of present entries.
    pub(super) feature_counts: Vec<usize>,
    /// Per-feature physical encoding.
    pub(super) types: Vec<ColumnType>,
    /// Row indices for sparse columns' slots; empty when no column is
    /// sparse.
    pub(super) row_ind: Vec<DataSize>,
    /// Element offset of each feature's column, length `n_features + 1`.
    pub(super) feature_offsets: Vec<usize>,
    /// Least global bin id per feature (owned copy of the cut pointers).
    pub(super) index_bases: Vec<BinIndex>,
    /// Missing bitmap over dense slots; `None` when the dataset has no
    /// missing values.
    pub(super) missing: Option<MissingFlags>,
    /// Stored bin-id width, shared by all columns.
    pub(super) width: BinWidth,
    /// Number of rows in the shard.
    pub(super) n_rows: usize,
}

impl ColumnStore {
    /// Build the store from a quantized matrix.
    ///
    /// A feature is stored sparse if its present count is below
    /// `sparse_threshold * n_rows`. `n_threads` shapes the row strips of the
    /// all-dense fast path; `0` means one strip per available CPU.
    pub fn build(
        matrix: &QuantizedMatrix,
        sparse_threshold: f64,
        n_threads: usize,
    ) -> Result<Self> {
        let n_rows = matrix.n_rows();
        let n_features = matrix.n_features();
        let n_threads = if n_threads == 0 {
            num_cpus::get()
        } else {
            n_threads
        };

        // Classify features. Any sparse column forces the row-scan path for
        // the whole build.
        let feature_counts = matrix.feature_counts();
        let mut all_dense = matrix.is_dense();
        let types: Vec<ColumnType> = feature_counts
            .iter()
            .map(|&count| {
                if (count as f64) < sparse_threshold * n_rows as f64 {
                    all_dense = false;
                    ColumnType::Sparse
                } else {
                    ColumnType::Dense
                }
            })
            .collect();

        // Storage boundary for each feature by prefix sum: a dense column
        // takes one slot per row, a sparse one a slot per present entry.
        let mut feature_offsets = Vec::with_capacity(n_features + 1);
        let mut accum = 0usize;
        feature_offsets.push(accum);
        for fid in 0..n_features {
            accum += match types[fid] {
                ColumnType::Dense => n_rows,
                ColumnType::Sparse => feature_counts[fid],
            };
            feature_offsets.push(accum);
        }
        let total_elements = accum;

        let width = BinWidth::for_max_bins(matrix.max_bins_per_feature());
        let mut bins = BinBuffer::zeroed(width, total_elements);
        let any_sparse = types.contains(&ColumnType::Sparse);
        let mut row_ind = if any_sparse {
            vec![0 as DataSize; total_elements]
        } else {
            Vec::new()
        };

        let any_missing = !matrix.is_dense();
        let mut missing = if any_missing {
            Some(MissingFlags::new_all_set(total_elements))
        } else {
            None
        };

        let cut_ptrs = matrix.cut_ptrs();
        let index_bases: Vec<BinIndex> = cut_ptrs[..n_features].to_vec();

        match &mut bins {
            BinBuffer::U8(v) => populate(
                v,
                matrix,
                &types,
                &feature_offsets,
                &index_bases,
                &mut row_ind,
                missing.as_mut(),
                all_dense,
                n_threads,
            ),
            BinBuffer::U16(v) => populate(
                v,
                matrix,
                &types,
                &feature_offsets,
                &index_bases,
                &mut row_ind,
                missing.as_mut(),
                all_dense,
                n_threads,
            ),
            BinBuffer::U32(v) => populate(
                v,
                matrix,
                &types,
                &feature_offsets,
                &index_bases,
                &mut row_ind,
                missing.as_mut(),
                all_dense,
                n_threads,
            ),
        }

        log::debug!(
            "built column store: {} rows, {} features ({} sparse), width {:?}, {} elements, missing: {}",
            n_rows,
            n_features,
            types.iter().filter(|t| **t == ColumnType::Sparse).count(),
            width,
            total_elements,
            any_missing,
        );

        Ok(Self {
            bins,
            feature_counts,
            types,
            row_ind,
            feature_offsets,
            index_bases,
            missing,
            width,
            n_rows,
        })
    }

    /// Number of features.
    pub fn n_features(&self) -> usize {
        self.types.len()
    }

    /// Number of rows in the shard.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// The bin-id width shared by all columns.
    pub fn width(&self) -> BinWidth {
        self.width
    }

    /// Whether any (feature, row) cell in the dataset is missing.
    pub fn any_missing(&self) -> bool {
        self.missing.is_some()
    }

    /// Physical encoding of one feature's column.
    pub fn column_type(&self, fid: FeatureIndex) -> ColumnType {
        self.types[fid]
    }

    /// Per-feature present-entry counts.
    pub fn feature_counts(&self) -> &[usize] {
        &self.feature_counts
    }

    /// Fetch a read-only view of one feature's column. No allocation; safe
    /// for concurrent calls.
    ///
    /// # Panics
    ///
    /// Panics if `T`'s width differs from [`ColumnStore::width`] or if
    /// `ANY_MISSING` differs from [`ColumnStore::any_missing`]; both
    /// indicate a bug in the caller's dispatch, not a data condition.
    pub fn column<T: BinIdx, const ANY_MISSING: bool>(
        &self,
        fid: FeatureIndex,
    ) -> Column<'_, T, ANY_MISSING> {
        assert_eq!(
            T::WIDTH,
            self.width,
            "column requested at width {:?} but the store uses {:?}",
            T::WIDTH,
            self.width
        );
        assert_eq!(
            ANY_MISSING,
            self.any_missing(),
            "column requested with ANY_MISSING = {} but the store has missing values: {}",
            ANY_MISSING,
            self.any_missing()
        );
        let offset = self.feature_offsets[fid];
        let end = self.feature_offsets[fid + 1];
        let index = &T::buffer(&self.bins).expect("width checked above")[offset..end];
        match self.types[fid] {
            ColumnType::Dense => Column::Dense(DenseColumn::new(
                index,
                self.index_bases[fid],
                self.missing.as_ref().map(|m| (m, offset)),
            )),
            ColumnType::Sparse => Column::Sparse(SparseColumn::new(
                index,
                &self.row_ind[offset..end],
                self.index_bases[fid],
            )),
        }
    }
}

/// Fill the bin buffer from the matrix.
///
/// The all-dense no-missing fast path writes in parallel strips over rows:
/// each worker owns a contiguous row range, and since every (feature, row)
/// destination cell belongs to exactly one row, no two workers ever touch
/// the same cell. The general path is one sequential pass over rows with a
/// per-feature running counter for sparse appends.
#[allow(clippy::too_many_arguments)]
fn populate<T: BinIdx>(
    bins: &mut [T],
    matrix: &QuantizedMatrix,
    types: &[ColumnType],
    feature_offsets: &[usize],
    index_bases: &[BinIndex],
    row_ind: &mut [DataSize],
    mut missing: Option<&mut MissingFlags>,
    all_dense: bool,
    n_threads: usize,
) {
    let n_rows = matrix.n_rows();
    if all_dense && missing.is_none() {
        let strip = n_rows.div_ceil(n_threads).max(MIN_CHUNK_SIZE.min(n_rows.max(1)));
        let n_strips = n_rows.div_ceil(strip.max(1)).max(1);
        let shared = SharedWriteSlice::new(bins);
        (0..n_strips).into_par_iter().for_each(|s| {
            let begin = s * strip;
            let end = (begin + strip).min(n_rows);
            for rid in begin..end {
                for entry in matrix.row(rid) {
                    let fid = entry.feature as usize;
                    let rel = entry.bin - index_bases[fid];
                    // SAFETY: cell (fid, rid) is written only by the strip
                    // owning row `rid`.
                    unsafe { shared.write(feature_offsets[fid] + rid, T::from_u32(rel)) };
                }
            }
        });
        return;
    }

    let mut num_nonzeros = vec![0usize; types.len()];
    for rid in 0..n_rows {
        for entry in matrix.row(rid) {
            let fid = entry.feature as usize;
            let rel = T::from_u32(entry.bin - index_bases[fid]);
            match types[fid] {
                ColumnType::Dense => {
                    let idx = feature_offsets[fid] + rid;
                    bins[idx] = rel;
                    if let Some(flags) = missing.as_deref_mut() {
                        flags.clear(idx);
                    }
                }
                ColumnType::Sparse => {
                    let idx = feature_offsets[fid] + num_nonzeros[fid];
                    bins[idx] = rel;
                    row_ind[idx] = rid as DataSize;
                    num_nonzeros[fid] += 1;
                    if let Some(flags) = missing.as_deref_mut() {
                        flags.clear(idx);
                    }
                }
            }
        }
    }
}
