//! Log error types.

use std::io;

use thiserror::Error;

use cinder_common::types::PageId;

/// Result type for log operations.
pub type WalResult<T> = Result<T, WalError>;

/// Errors raised by the write-ahead log.
///
/// Torn or checksum-mismatched records found during recovery are not
/// errors; they are handled in place by truncation and skipping.
#[derive(Debug, Error)]
pub enum WalError {
    /// I/O error from the log file. Surfaced verbatim.
    #[error("log I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// A transaction entry addresses bytes past the end of the page body.
    /// Rejected before anything is written.
    #[error(
        "entry out of bounds on page {page_id}: offset {offset} + length {length} exceeds the page body"
    )]
    EntryOutOfBounds {
        /// The page the entry addresses.
        page_id: PageId,
        /// Start offset within the page body.
        offset: u32,
        /// Length of the entry's byte range.
        length: u32,
    },

    /// An entry's pre- and post-images differ in length.
    #[error("entry image length mismatch on page {page_id}: old {old_len} vs new {new_len}")]
    ImageLengthMismatch {
        /// The page the entry addresses.
        page_id: PageId,
        /// Length of the pre-image.
        old_len: usize,
        /// Length of the post-image.
        new_len: usize,
    },
}
