//! Columnar bin store: per-feature column views over one shared buffer.
//!
//! The store lays every feature's bin ids back to back in a single typed
//! buffer and hands out borrowed views per feature. A column is either dense
//! (one slot per row plus an optional missing bitmap) or sparse (parallel
//! row-index/bin arrays holding only the present entries); the distinction
//! is a tagged enum resolved once per feature, never a per-row virtual call.

pub mod dense;
pub mod serial;
pub mod sparse;
pub mod store;
pub mod width;

pub use dense::DenseColumn;
pub use sparse::SparseColumn;
pub use store::ColumnStore;
pub use width::BinWidth;

use serde::{Deserialize, Serialize};

/// Physical encoding chosen for one feature's column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// One bin id per row.
    Dense,
    /// (row index, bin id) pairs for present rows only.
    Sparse,
}

/// Typed backing buffer holding every column's bin ids contiguously.
///
/// The variant is fixed by the store's [`BinWidth`]; keeping the buffer
/// typed (rather than reinterpreting raw bytes) preserves alignment and lets
/// the views borrow plain slices.
#[derive(Debug, Clone)]
pub enum BinBuffer {
    /// 1-byte bin ids.
    U8(Vec<u8>),
    /// 2-byte bin ids.
    U16(Vec<u16>),
    /// 4-byte bin ids.
    U32(Vec<u32>),
}

impl BinBuffer {
    /// Allocate a zero-filled buffer of `len` elements at the given width.
    pub fn zeroed(width: BinWidth, len: usize) -> Self {
        match width {
            BinWidth::U8 => BinBuffer::U8(vec![0; len]),
            BinWidth::U16 => BinBuffer::U16(vec![0; len]),
            BinWidth::U32 => BinBuffer::U32(vec![0; len]),
        }
    }

    /// Element count.
    pub fn len(&self) -> usize {
        match self {
            BinBuffer::U8(v) => v.len(),
            BinBuffer::U16(v) => v.len(),
            BinBuffer::U32(v) => v.len(),
        }
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The width of this buffer's elements.
    pub fn width(&self) -> BinWidth {
        match self {
            BinBuffer::U8(_) => BinWidth::U8,
            BinBuffer::U16(_) => BinWidth::U16,
            BinBuffer::U32(_) => BinWidth::U32,
        }
    }
}

mod private {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
}

/// Storage integer for bin ids: `u8`, `u16`, or `u32`.
///
/// Callers pick the type at the point they read a column; a mismatch with
/// the store's chosen width is a contract violation.
pub trait BinIdx:
    num_traits::PrimInt + Copy + Send + Sync + private::Sealed + 'static
{
    /// The width this type occupies in a [`BinBuffer`].
    const WIDTH: BinWidth;

    /// Narrow a relative bin id into storage form. The build path has
    /// already verified that every relative id fits the chosen width.
    fn from_u32(value: u32) -> Self;

    /// Widen a stored id back to `u32`.
    fn to_u32(self) -> u32;

    /// Borrow the matching typed slice, `None` on width mismatch.
    fn buffer(buf: &BinBuffer) -> Option<&[Self]>;

    /// Mutably borrow the matching typed slice, `None` on width mismatch.
    fn buffer_mut(buf: &mut BinBuffer) -> Option<&mut [Self]>;
}

macro_rules! impl_bin_idx {
    ($ty:ty, $width:expr, $variant:ident) => {
        impl BinIdx for $ty {
            const WIDTH: BinWidth = $width;

            fn from_u32(value: u32) -> Self {
                debug_assert!(value <= <$ty>::MAX as u32);
                value as $ty
            }

            fn to_u32(self) -> u32 {
                self as u32
            }

            fn buffer(buf: &BinBuffer) -> Option<&[Self]> {
                match buf {
                    BinBuffer::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn buffer_mut(buf: &mut BinBuffer) -> Option<&mut [Self]> {
                match buf {
                    BinBuffer::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_bin_idx!(u8, BinWidth::U8, U8);
impl_bin_idx!(u16, BinWidth::U16, U16);
impl_bin_idx!(u32, BinWidth::U32, U32);

/// Bitmap of missing (feature, row) cells over the dense slots of the whole
/// store, indexed by `feature_offset + row`. Only materialized when the
/// dataset has any missing values.
#[derive(Debug, Clone)]
pub struct MissingFlags {
    words: Vec<u64>,
    len: usize,
}

impl MissingFlags {
    /// Create a bitmap of `len` bits, all set (everything missing until
    /// written).
    pub fn new_all_set(len: usize) -> Self {
        let n_words = len.div_ceil(64);
        let mut words = vec![u64::MAX; n_words];
        if let Some(last) = words.last_mut() {
            let tail = len % 64;
            if tail != 0 {
                *last = (1u64 << tail) - 1;
            }
        }
        Self { words, len }
    }

    /// Rebuild a bitmap from serialized words.
    pub fn from_words(words: Vec<u64>, len: usize) -> crate::core::error::Result<Self> {
        if words.len() != len.div_ceil(64) {
            return Err(crate::core::error::GbdtError::serialization(format!(
                "missing bitmap has {} words, expected {} for {} bits",
                words.len(),
                len.div_ceil(64),
                len
            )));
        }
        Ok(Self { words, len })
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the bitmap has no bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Test bit `idx`.
    pub fn get(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len);
        self.words[idx / 64] & (1u64 << (idx % 64)) != 0
    }

    /// Clear bit `idx` (the cell is present).
    pub fn clear(&mut self, idx: usize) {
        debug_assert!(idx < self.len);
        self.words[idx / 64] &= !(1u64 << (idx % 64));
    }

    /// The raw words, for serialization.
    pub fn words(&self) -> &[u64] {
        &self.words
    }
}

/// Read-only view of one feature's column.
///
/// `T` must match the store's bin width and `ANY_MISSING` its missing mode;
/// both are checked once at [`ColumnStore::column`] and never per row.
#[derive(Debug)]
pub enum Column<'a, T: BinIdx, const ANY_MISSING: bool> {
    /// Dense column view.
    Dense(DenseColumn<'a, T, ANY_MISSING>),
    /// Sparse column view.
    Sparse(SparseColumn<'a, T>),
}

impl<'a, T: BinIdx, const ANY_MISSING: bool> Column<'a, T, ANY_MISSING> {
    /// The physical encoding of this column.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Dense(_) => ColumnType::Dense,
            Column::Sparse(_) => ColumnType::Sparse,
        }
    }

    /// Number of stored elements: rows for a dense column, present entries
    /// for a sparse one.
    pub fn len(&self) -> usize {
        match self {
            Column::Dense(c) => c.len(),
            Column::Sparse(c) => c.len(),
        }
    }

    /// Whether the column stores no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
