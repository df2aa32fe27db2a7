//! Integration tests for the columnar bin store built through the public
//! API: classification, width selection, and lookups across dense, sparse,
//! and missing-value datasets.

use gbdt_core::*;
use ndarray::Array2;

/// CSR matrix where feature presence per row is driven by a closure.
fn matrix_from_pattern<F>(
    n_rows: u32,
    cut_ptrs: Vec<BinIndex>,
    cell: F,
) -> QuantizedMatrix
where
    F: Fn(u32, u32) -> Option<BinIndex>,
{
    let n_features = cut_ptrs.len() - 1;
    let mut entries = Vec::new();
    let mut row_ptr = vec![0usize];
    for rid in 0..n_rows {
        for fid in 0..n_features as u32 {
            if let Some(bin) = cell(rid, fid) {
                entries.push(Entry { feature: fid, bin });
            }
        }
        row_ptr.push(entries.len());
    }
    QuantizedMatrix::new(cut_ptrs, row_ptr, entries).unwrap()
}

#[test]
fn test_all_dense_store_reproduces_every_cell() {
    gbdt_core::init();
    let n_rows = 64;
    let bins = Array2::from_shape_fn((n_rows, 3), |(rid, fid)| {
        let base = [0u32, 5, 12][fid];
        base + (rid as u32 * 7 + fid as u32) % [5, 7, 4][fid]
    });
    let matrix = QuantizedMatrix::from_dense(bins.view(), vec![0, 5, 12, 16]).unwrap();
    let store = ColumnStore::build(&matrix, 0.2, 4).unwrap();

    assert_eq!(store.n_rows(), n_rows);
    assert_eq!(store.n_features(), 3);
    assert_eq!(store.width(), BinWidth::U8);
    assert!(!store.any_missing());

    for fid in 0..3 {
        let Column::Dense(col) = store.column::<u8, false>(fid) else {
            panic!("feature {} should be dense", fid)
        };
        for rid in 0..n_rows as u32 {
            assert_eq!(col.bin_idx(rid), Some(bins[[rid as usize, fid]]));
        }
    }
}

#[test]
fn test_mixed_density_classification() {
    // Feature 0 present everywhere, feature 1 in 1 of 10 rows, feature 2 in
    // 4 of 10. At threshold 0.5 features 1 and 2 are sparse.
    let matrix = matrix_from_pattern(10, vec![0, 4, 8, 12], |rid, fid| match fid {
        0 => Some(rid % 4),
        1 if rid == 6 => Some(4 + 2),
        2 if rid % 3 == 0 => Some(8 + rid % 4),
        _ => None,
    });
    let store = ColumnStore::build(&matrix, 0.5, 1).unwrap();

    assert_eq!(store.column_type(0), ColumnType::Dense);
    assert_eq!(store.column_type(1), ColumnType::Sparse);
    assert_eq!(store.column_type(2), ColumnType::Sparse);
    assert_eq!(store.feature_counts(), &[10, 1, 4]);
    assert!(store.any_missing());

    let Column::Sparse(col) = store.column::<u8, true>(2) else {
        panic!("feature 2 should be sparse")
    };
    let mut cursor = col.initial_cursor(0);
    for rid in 0..10u32 {
        let expected = if rid % 3 == 0 { Some(8 + rid % 4) } else { None };
        assert_eq!(col.bin_idx(rid, &mut cursor), expected);
    }
}

#[test]
fn test_sparse_cursor_can_start_mid_column() {
    let matrix = matrix_from_pattern(100, vec![0, 3, 6], |rid, fid| match fid {
        0 => Some(rid % 3),
        1 if rid % 10 == 0 => Some(3 + rid / 50),
        _ => None,
    });
    let store = ColumnStore::build(&matrix, 0.2, 1).unwrap();
    let Column::Sparse(col) = store.column::<u8, true>(1) else {
        panic!("feature 1 should be sparse")
    };

    // A scan over the second half only, as a partitioned node would do.
    let mut cursor = col.initial_cursor(50);
    for rid in 50..100u32 {
        let expected = if rid % 10 == 0 { Some(3 + rid / 50) } else { None };
        assert_eq!(col.bin_idx(rid, &mut cursor), expected);
    }
}

#[test]
fn test_width_boundaries() {
    // 256 bins on a feature still fits one byte (ids 0..=255); 257 does not.
    for (n_bins, expected) in [
        (2u32, BinWidth::U8),
        (256, BinWidth::U8),
        (257, BinWidth::U16),
        (65536, BinWidth::U16),
        (65537, BinWidth::U32),
    ] {
        let matrix = matrix_from_pattern(2, vec![0, n_bins], |rid, _| {
            Some(if rid == 0 { 0 } else { n_bins - 1 })
        });
        let store = ColumnStore::build(&matrix, 0.0, 1).unwrap();
        assert_eq!(store.width(), expected, "for {} bins", n_bins);
    }
}

#[test]
fn test_width_is_global_across_features() {
    // A single wide feature forces every column to two bytes.
    let matrix = matrix_from_pattern(4, vec![0, 2, 302], |rid, fid| match fid {
        0 => Some(rid % 2),
        _ => Some(2 + rid * 99),
    });
    let store = ColumnStore::build(&matrix, 0.0, 1).unwrap();
    assert_eq!(store.width(), BinWidth::U16);

    let Column::Dense(narrow) = store.column::<u16, false>(0) else {
        panic!("feature 0 should be dense")
    };
    assert_eq!(narrow.bin_idx(3), Some(1));
}

#[test]
fn test_stored_ids_are_relative_to_feature_base() {
    let matrix = matrix_from_pattern(3, vec![0, 1000, 1003], |rid, fid| match fid {
        0 => Some(rid * 400),
        _ => Some(1000 + rid),
    });
    let store = ColumnStore::build(&matrix, 0.0, 1).unwrap();
    // Global ids reach 1002 but every relative id fits one byte... except
    // feature 0, whose own bin count (1000) forces u16.
    assert_eq!(store.width(), BinWidth::U16);

    let Column::Dense(col) = store.column::<u16, false>(1) else {
        panic!("feature 1 should be dense")
    };
    assert_eq!(col.base_idx(), 1000);
    assert_eq!(col.feature_bin(2), 2u16);
    assert_eq!(col.global_bin(2), 1002);
}

#[test]
fn test_zero_rows() {
    let matrix = QuantizedMatrix::new(vec![0, 2, 4], vec![0], vec![]).unwrap();
    let store = ColumnStore::build(&matrix, 0.2, 1).unwrap();
    assert_eq!(store.n_rows(), 0);
    assert_eq!(store.n_features(), 2);
}

#[test]
fn test_parallel_build_matches_sequential() {
    let n_rows = 5000;
    let bins = Array2::from_shape_fn((n_rows, 4), |(rid, fid)| {
        let base = fid as u32 * 10;
        base + (rid as u32).wrapping_mul(2654435761) % 10
    });
    let cut_ptrs = vec![0, 10, 20, 30, 40];
    let matrix = QuantizedMatrix::from_dense(bins.view(), cut_ptrs).unwrap();

    let serial = ColumnStore::build(&matrix, 0.2, 1).unwrap();
    let parallel = ColumnStore::build(&matrix, 0.2, 8).unwrap();
    for fid in 0..4 {
        let Column::Dense(a) = serial.column::<u8, false>(fid) else {
            panic!("dense expected")
        };
        let Column::Dense(b) = parallel.column::<u8, false>(fid) else {
            panic!("dense expected")
        };
        for rid in 0..n_rows as u32 {
            assert_eq!(a.bin_idx(rid), b.bin_idx(rid));
        }
    }
}

#[test]
fn test_malformed_matrix_is_rejected() {
    // Bin outside the feature's cut range.
    let err = QuantizedMatrix::new(
        vec![0, 2],
        vec![0, 1],
        vec![Entry { feature: 0, bin: 5 }],
    )
    .unwrap_err();
    assert!(matches!(err, GbdtError::DataShape { .. }));

    // row_ptr not ending at the entry count.
    let err = QuantizedMatrix::new(vec![0, 2], vec![0, 2], vec![Entry { feature: 0, bin: 1 }])
        .unwrap_err();
    assert!(matches!(err, GbdtError::DataShape { .. }));
}
