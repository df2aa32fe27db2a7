//! Binary serialization of the columnar bin store.
//!
//! Layout: a fixed sequence of `u64`-length-prefixed vectors (bin buffer as
//! raw element bytes, feature non-missing counts, per-feature type tags,
//! sparse row-index buffer, feature offset table), then a one-byte width
//! tag, a one-byte any-missing flag, the `u64` row count, and finally (only
//! when the flag is set) the missing-bitmap words. All integers
//! little-endian on disk regardless of host byte order. The row count is
//! stored explicitly; an all-sparse store cannot recover it from its
//! columns when the trailing rows are entirely missing. The per-feature
//! bases are not persisted: they are rederived on read from the caller's
//! cut pointers, which are part of the externally owned cut matrix.

use super::store::ColumnStore;
use super::{BinBuffer, BinWidth, ColumnType, MissingFlags};
use crate::core::error::{GbdtError, Result};
use crate::core::types::{BinIndex, DataSize};
use crate::io::codec::{write_scalar, write_slice, BinaryWriter, ByteReader};

const TYPE_TAG_DENSE: u8 = 0;
const TYPE_TAG_SPARSE: u8 = 1;

impl ColumnStore {
    /// Serialize the store. Returns the number of bytes written.
    pub fn write_to(&self, writer: &mut impl BinaryWriter) -> Result<usize> {
        let mut bytes = 0;
        bytes += write_slice(writer, &bin_buffer_bytes(&self.bins))?;
        let counts: Vec<u64> = self.feature_counts.iter().map(|&c| c as u64).collect();
        bytes += write_slice(writer, &counts)?;
        let type_tags: Vec<u8> = self
            .types
            .iter()
            .map(|t| match t {
                ColumnType::Dense => TYPE_TAG_DENSE,
                ColumnType::Sparse => TYPE_TAG_SPARSE,
            })
            .collect();
        bytes += write_slice(writer, &type_tags)?;
        bytes += write_slice(writer, &self.row_ind)?;
        let offsets: Vec<u64> = self.feature_offsets.iter().map(|&o| o as u64).collect();
        bytes += write_slice(writer, &offsets)?;
        bytes += write_scalar(writer, self.width.bytes() as u8)?;
        bytes += write_scalar(writer, self.missing.is_some() as u8)?;
        bytes += write_scalar(writer, self.n_rows as u64)?;
        if let Some(flags) = &self.missing {
            bytes += write_slice(writer, flags.words())?;
        }
        log::debug!("serialized column store: {} bytes", bytes);
        Ok(bytes)
    }

    /// Deserialize a store written by [`ColumnStore::write_to`].
    ///
    /// `cut_ptrs` must be the same cut matrix the store was built against;
    /// the per-feature bases are rederived from it.
    pub fn read_from(bytes: &[u8], cut_ptrs: &[BinIndex]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let bin_bytes = reader.read_vec::<u8>()?;
        let feature_counts: Vec<usize> = reader
            .read_vec::<u64>()?
            .into_iter()
            .map(|c| c as usize)
            .collect();
        let types = reader
            .read_vec::<u8>()?
            .into_iter()
            .map(|tag| match tag {
                TYPE_TAG_DENSE => Ok(ColumnType::Dense),
                TYPE_TAG_SPARSE => Ok(ColumnType::Sparse),
                other => Err(GbdtError::serialization(format!(
                    "invalid column type tag {}",
                    other
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        let row_ind = reader.read_vec::<DataSize>()?;
        let feature_offsets: Vec<usize> = reader
            .read_vec::<u64>()?
            .into_iter()
            .map(|o| o as usize)
            .collect();
        let width = BinWidth::from_tag(reader.read_scalar::<u8>()?)?;
        let any_missing = reader.read_scalar::<u8>()? != 0;
        let n_rows = usize::try_from(reader.read_scalar::<u64>()?)
            .map_err(|_| GbdtError::serialization("row count overflows"))?;

        let n_features = types.len();
        if feature_counts.len() != n_features {
            return Err(GbdtError::serialization(format!(
                "feature count vector has length {}, expected {}",
                feature_counts.len(),
                n_features
            )));
        }
        if feature_offsets.len() != n_features + 1
            || feature_offsets.first() != Some(&0)
            || feature_offsets.windows(2).any(|w| w[0] > w[1])
        {
            return Err(GbdtError::serialization(
                "feature offset table is not a monotone prefix sum",
            ));
        }
        if cut_ptrs.len() != n_features + 1 {
            return Err(GbdtError::data_shape(format!(
                "cut_ptrs has length {}, expected {} for {} features",
                cut_ptrs.len(),
                n_features + 1,
                n_features
            )));
        }
        let total_elements = *feature_offsets.last().unwrap();
        if bin_bytes.len() != total_elements * width.bytes() {
            return Err(GbdtError::serialization(format!(
                "bin buffer holds {} bytes, expected {} ({} elements at {} bytes)",
                bin_bytes.len(),
                total_elements * width.bytes(),
                total_elements,
                width.bytes()
            )));
        }
        if !row_ind.is_empty() && row_ind.len() != total_elements {
            return Err(GbdtError::serialization(format!(
                "row index buffer holds {} entries, expected 0 or {}",
                row_ind.len(),
                total_elements
            )));
        }

        // Every feature's span must match its encoding: one slot per row
        // when dense, one per present entry when sparse. Without this a
        // crafted blob could pass the length checks above and still hand
        // out views that index out of bounds.
        for (fid, ty) in types.iter().enumerate() {
            let span = feature_offsets[fid + 1] - feature_offsets[fid];
            let expected = match ty {
                ColumnType::Dense => n_rows,
                ColumnType::Sparse => feature_counts[fid],
            };
            if span != expected {
                return Err(GbdtError::serialization(format!(
                    "feature {} spans {} elements, expected {}",
                    fid, span, expected
                )));
            }
        }
        if row_ind.iter().any(|&r| r as usize >= n_rows) {
            return Err(GbdtError::serialization(
                "sparse row index outside the row count",
            ));
        }

        let missing = if any_missing {
            Some(MissingFlags::from_words(
                reader.read_vec::<u64>()?,
                total_elements,
            )?)
        } else {
            None
        };
        if reader.remaining() != 0 {
            return Err(GbdtError::serialization(format!(
                "{} trailing bytes after the store",
                reader.remaining()
            )));
        }

        Ok(Self {
            bins: bin_buffer_from_bytes(width, &bin_bytes),
            feature_counts,
            types,
            row_ind,
            feature_offsets,
            index_bases: cut_ptrs[..n_features].to_vec(),
            missing,
            width,
            n_rows,
        })
    }
}

/// Flatten the typed bin buffer to per-element little-endian bytes.
fn bin_buffer_bytes(bins: &BinBuffer) -> Vec<u8> {
    match bins {
        BinBuffer::U8(v) => v.clone(),
        BinBuffer::U16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        BinBuffer::U32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
    }
}

/// Rebuild the typed bin buffer from little-endian bytes. Length has been
/// validated against the width.
fn bin_buffer_from_bytes(width: BinWidth, bytes: &[u8]) -> BinBuffer {
    match width {
        BinWidth::U8 => BinBuffer::U8(bytes.to_vec()),
        BinWidth::U16 => BinBuffer::U16(
            bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect(),
        ),
        BinWidth::U32 => BinBuffer::U32(
            bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::io::codec::VecBinaryWriter;
    use crate::matrix::{Entry, QuantizedMatrix};
    use ndarray::array;

    #[test]
    fn test_round_trip_dense() {
        let bins = array![[0u32, 3], [1, 4], [2, 5]];
        let matrix = QuantizedMatrix::from_dense(bins.view(), vec![0, 3, 6]).unwrap();
        let store = ColumnStore::build(&matrix, 0.2, 1).unwrap();

        let mut writer = VecBinaryWriter::new();
        let written = store.write_to(&mut writer).unwrap();
        assert_eq!(written, writer.len());

        let restored = ColumnStore::read_from(writer.buffer(), matrix.cut_ptrs()).unwrap();
        assert_eq!(restored.n_rows(), store.n_rows());
        assert_eq!(restored.n_features(), store.n_features());
        assert_eq!(restored.width(), store.width());
        assert_eq!(restored.any_missing(), store.any_missing());
    }

    #[test]
    fn test_all_sparse_round_trip_keeps_row_count() {
        // Single sparse feature present only in row 2 of 10; the trailing
        // rows are entirely missing, so the row count is unrecoverable from
        // the columns alone and must come from the blob.
        let mut entries = Vec::new();
        let mut row_ptr = vec![0usize];
        for rid in 0..10u32 {
            if rid == 2 {
                entries.push(Entry { feature: 0, bin: 1 });
            }
            row_ptr.push(entries.len());
        }
        let matrix = QuantizedMatrix::new(vec![0, 3], row_ptr, entries).unwrap();
        let store = ColumnStore::build(&matrix, 0.2, 1).unwrap();
        assert_eq!(store.column_type(0), ColumnType::Sparse);
        assert_eq!(store.n_rows(), 10);

        let mut writer = VecBinaryWriter::new();
        store.write_to(&mut writer).unwrap();
        let restored = ColumnStore::read_from(writer.buffer(), matrix.cut_ptrs()).unwrap();
        assert_eq!(restored.n_rows(), 10);

        let Column::Sparse(col) = restored.column::<u8, true>(0) else {
            panic!("expected sparse column")
        };
        let mut cursor = col.initial_cursor(0);
        for rid in 0..10u32 {
            let expected = if rid == 2 { Some(1) } else { None };
            assert_eq!(col.bin_idx(rid, &mut cursor), expected);
        }
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let bins = array![[0u32, 3], [1, 4]];
        let matrix = QuantizedMatrix::from_dense(bins.view(), vec![0, 3, 6]).unwrap();
        let store = ColumnStore::build(&matrix, 0.2, 1).unwrap();
        let mut writer = VecBinaryWriter::new();
        store.write_to(&mut writer).unwrap();
        let mut bytes = writer.into_buffer();
        bytes.push(0);

        let err = ColumnStore::read_from(&bytes, matrix.cut_ptrs()).unwrap_err();
        assert!(matches!(err, GbdtError::Serialization { .. }));
    }

    #[test]
    fn test_tampered_row_count_is_rejected() {
        let bins = array![[0u32, 3], [1, 4]];
        let matrix = QuantizedMatrix::from_dense(bins.view(), vec![0, 3, 6]).unwrap();
        let store = ColumnStore::build(&matrix, 0.2, 1).unwrap();
        let mut writer = VecBinaryWriter::new();
        store.write_to(&mut writer).unwrap();
        let mut bytes = writer.into_buffer();

        // With no missing section the blob ends with the u64 row count;
        // bumping it must fail the dense span check, not produce a store.
        let n = bytes.len();
        bytes[n - 8] = bytes[n - 8].wrapping_add(1);
        let err = ColumnStore::read_from(&bytes, matrix.cut_ptrs()).unwrap_err();
        assert!(matches!(err, GbdtError::Serialization { .. }));
    }

    #[test]
    fn test_truncated_blob_is_an_error() {
        let bins = array![[0u32, 3], [1, 4]];
        let matrix = QuantizedMatrix::from_dense(bins.view(), vec![0, 3, 6]).unwrap();
        let store = ColumnStore::build(&matrix, 0.2, 1).unwrap();
        let mut writer = VecBinaryWriter::new();
        store.write_to(&mut writer).unwrap();
        let bytes = writer.into_buffer();

        for cut in [0, 1, bytes.len() / 2, bytes.len() - 1] {
            assert!(
                ColumnStore::read_from(&bytes[..cut], matrix.cut_ptrs()).is_err(),
                "truncation at {} must fail",
                cut
            );
        }
    }

    #[test]
    fn test_wrong_cut_count_is_an_error() {
        let bins = array![[0u32, 3], [1, 4]];
        let matrix = QuantizedMatrix::from_dense(bins.view(), vec![0, 3, 6]).unwrap();
        let store = ColumnStore::build(&matrix, 0.2, 1).unwrap();
        let mut writer = VecBinaryWriter::new();
        store.write_to(&mut writer).unwrap();

        let err = ColumnStore::read_from(writer.buffer(), &[0, 3]).unwrap_err();
        assert!(matches!(err, GbdtError::DataShape { .. }));
    }
}
