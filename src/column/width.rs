//! Bin-id storage width selection.

use crate::core::error::{GbdtError, Result};
use serde::{Deserialize, Serialize};

/// Physical width of stored bin ids, shared across all columns of a store.
///
/// The narrowest width that represents `max_bins_per_feature - 1` is chosen
/// once per dataset; stored ids are relative to each feature's base, so only
/// the per-feature bin count matters, never the global bin count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinWidth {
    /// One byte per bin id.
    U8,
    /// Two bytes per bin id.
    U16,
    /// Four bytes per bin id.
    U32,
}

impl BinWidth {
    /// Choose the narrowest width whose maximum value covers
    /// `max_bins - 1`.
    pub fn for_max_bins(max_bins: usize) -> Self {
        let max_id = max_bins.saturating_sub(1);
        if max_id <= u8::MAX as usize {
            BinWidth::U8
        } else if max_id <= u16::MAX as usize {
            BinWidth::U16
        } else {
            BinWidth::U32
        }
    }

    /// Size of one stored bin id in bytes. Doubles as the serialized tag.
    pub fn bytes(self) -> usize {
        match self {
            BinWidth::U8 => 1,
            BinWidth::U16 => 2,
            BinWidth::U32 => 4,
        }
    }

    /// Decode a serialized width tag.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(BinWidth::U8),
            2 => Ok(BinWidth::U16),
            4 => Ok(BinWidth::U32),
            other => Err(GbdtError::serialization(format!(
                "invalid bin width tag {}",
                other
            ))),
        }
    }
}
