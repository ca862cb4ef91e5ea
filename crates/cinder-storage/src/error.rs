//! Storage error types.

use std::io;

use thiserror::Error;

use cinder_common::types::PageId;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by the page allocator.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error from the underlying file. Surfaced verbatim.
    #[error("storage I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// The stored page checksum disagrees with the checksum computed over
    /// the page body. Indicates on-disk corruption; the allocator does not
    /// attempt repair.
    #[error(
        "checksum mismatch on page {page_id}: stored {expected:#010x}, computed {found:#010x}"
    )]
    ChecksumMismatch {
        /// The corrupt page.
        page_id: PageId,
        /// The checksum stored in the page header.
        expected: u32,
        /// The checksum computed from the page body.
        found: u32,
    },
}

impl StorageError {
    /// Creates a checksum mismatch error.
    pub fn checksum_mismatch(page_id: PageId, expected: u32, found: u32) -> Self {
        Self::ChecksumMismatch {
            page_id,
            expected,
            found,
        }
    }

    /// Returns true if this error indicates on-disk corruption.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_mismatch_display() {
        let err = StorageError::checksum_mismatch(PageId::new(3), 0x1234, 0x5678);
        let msg = err.to_string();
        assert!(msg.contains("page 3"));
        assert!(msg.contains("0x00001234"));
        assert!(err.is_corruption());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: StorageError = io_err.into();
        assert!(matches!(err, StorageError::Io { .. }));
        assert!(!err.is_corruption());
    }
}
