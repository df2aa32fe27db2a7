//! Error handling and error types for the training core.
//!
//! Two failure classes exist in this crate and they are deliberately kept
//! apart. Malformed *data* (an inconsistent quantized matrix, a truncated
//! serialized store) is a runtime condition and surfaces as a
//! [`GbdtError`]. A malformed *call* (requesting a column at the wrong bin
//! width, a split predicate returning a node id that is neither declared
//! child) is a defect in the tree grower and panics immediately; nothing in
//! this crate attempts to recover from it, and no operation retries.

use std::io;
use thiserror::Error;

/// Main error type for the training core.
#[derive(Error, Debug)]
pub enum GbdtError {
    /// Shape mismatch between collaborating structures: row counts, feature
    /// counts, or bin ranges that do not line up.
    #[error("Data shape error: {message}")]
    DataShape {
        /// Description of the mismatch.
        message: String,
    },

    /// Serialized store is malformed: truncated input, an unknown tag value,
    /// or a length prefix pointing past the end of the buffer.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the malformed input.
        message: String,
    },

    /// File I/O errors while writing or reading a serialized store.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// Internal invariant violation (should not occur in normal usage).
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the violated invariant.
        message: String,
    },
}

impl GbdtError {
    /// Create a data-shape error.
    pub fn data_shape<S: Into<String>>(message: S) -> Self {
        GbdtError::DataShape {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        GbdtError::Serialization {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        GbdtError::Internal {
            message: message.into(),
        }
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GbdtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GbdtError::data_shape("row_ptr has length 3, expected 5");
        assert_eq!(
            err.to_string(),
            "Data shape error: row_ptr has length 3, expected 5"
        );

        let err = GbdtError::serialization("unexpected end of input");
        assert!(err.to_string().starts_with("Serialization error:"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        let err: GbdtError = io_err.into();
        assert!(matches!(err, GbdtError::Io { .. }));
    }
}
