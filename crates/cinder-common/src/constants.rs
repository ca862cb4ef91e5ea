//! On-disk layout constants and engine defaults.
//!
//! All multi-byte integers stored on disk are little-endian, regardless of
//! host endianness.

// =============================================================================
// Page layout
// =============================================================================

/// Size of a database page in bytes. Fixed at file-creation time; the value
/// is also recorded in the metadata page and checked by the verify pass.
pub const PAGE_SIZE: usize = 4096;

/// Size of the page header in bytes: version (1) + type (1) + checksum (4).
pub const PAGE_HEADER_SIZE: usize = 6;

/// Number of body bytes per page. The body is the checksummed payload.
pub const PAGE_BODY_SIZE: usize = PAGE_SIZE - PAGE_HEADER_SIZE;

/// Current page format version, stored in the first header byte.
pub const PAGE_FORMAT_VERSION: u8 = 0;

/// Offset of the version byte within the page header.
pub const PAGE_VERSION_OFFSET: usize = 0;

/// Offset of the type byte within the page header.
pub const PAGE_TYPE_OFFSET: usize = 1;

/// Offset of the CRC32 checksum within the page header (4 bytes).
pub const PAGE_CHECKSUM_OFFSET: usize = 2;

// =============================================================================
// Metadata page
// =============================================================================
//
// Page 0 is always the metadata page. The offsets below are relative to the
// page *body* (add PAGE_HEADER_SIZE for the file offset).

/// Body offset of the free-list head pointer (u64; 0 means the list is empty).
pub const META_FREE_LIST_HEAD_OFFSET: u64 = 0;

/// Body offset of the total page count (u64; includes the metadata page).
pub const META_TOTAL_PAGE_COUNT_OFFSET: u64 = 8;

/// Body offset of the page size the file was created with (u64).
pub const META_PAGE_SIZE_OFFSET: u64 = 16;

// =============================================================================
// Engine defaults
// =============================================================================

/// Default data file name.
pub const DEFAULT_DATA_FILE: &str = "data.db";

/// Default write-ahead log file name.
pub const DEFAULT_WAL_FILE: &str = "wal.log";

/// Default log size, in bytes, at which a checkpoint is triggered.
pub const DEFAULT_CHECKPOINT_THRESHOLD: u64 = 10_000;

/// Default page cache capacity, in pages.
pub const DEFAULT_CACHE_CAPACITY: usize = 32_000;
