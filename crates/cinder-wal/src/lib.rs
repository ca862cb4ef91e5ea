//! Write-ahead log for the Cinder storage engine.
//!
//! The log is a single append-only file of transaction records. Each record
//! carries pre- and post-images for a set of page byte ranges, is framed by
//! a repeated transaction id, and ends with a CRC32 over the whole record —
//! the torn-write sentinel that makes recovery after a crash mid-append
//! safe.
//!
//! Opening the log replays it from byte 0: records that validate are
//! installed into an in-memory per-page redo cache, records that decode but
//! fail their checksum are retained on disk and skipped, and trailing bytes
//! that do not decode are truncated away. The log is rotated (deleted and
//! recreated) when a checkpoint has made the data file authoritative.

#![warn(clippy::all)]

mod error;
mod reader;
mod record;
mod wal;

pub use error::{WalError, WalResult};
pub use reader::WalReader;
pub use record::{PageEntry, Transaction, TransactionFooter, TransactionHeader};
pub use wal::{PageUpdate, WriteAheadLog};
