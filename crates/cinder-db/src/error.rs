//! Database manager error types.

use thiserror::Error;

use cinder_common::types::PageId;
use cinder_storage::StorageError;
use cinder_wal::WalError;

/// Result type for database manager operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors surfaced by the database manager.
#[derive(Debug, Error)]
pub enum DbError {
    /// Error from the page allocator, including I/O and checksum
    /// mismatches.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Error from the write-ahead log.
    #[error(transparent)]
    Wal(#[from] WalError),

    /// A delta addresses bytes past the end of the page body. Returned
    /// before anything is mutated or logged.
    #[error(
        "delta out of bounds on page {page_id}: offset {offset} + length {length} exceeds the page body"
    )]
    DeltaOutOfBounds {
        /// The page the delta addresses.
        page_id: PageId,
        /// Start offset within the page body.
        offset: u32,
        /// Length of the delta's payload.
        length: usize,
    },

    /// A page that should have been faulted into the cache was not there.
    /// This is an internal invariant violation.
    #[error("page {page_id} not found in memory")]
    PageNotFound {
        /// The missing page.
        page_id: PageId,
    },

    /// The configuration failed validation.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What was wrong.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_display() {
        let err = DbError::DeltaOutOfBounds {
            page_id: PageId::new(5),
            offset: 4000,
            length: 200,
        };
        assert!(err.to_string().contains("page 5"));
    }

    #[test]
    fn test_storage_error_passthrough() {
        let inner = StorageError::checksum_mismatch(PageId::new(1), 1, 2);
        let err: DbError = inner.into();
        // Transparent: the storage message is the whole message.
        assert!(err.to_string().contains("checksum mismatch"));
    }
}
