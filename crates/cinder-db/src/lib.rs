//! Database manager for the Cinder storage engine.
//!
//! [`DatabaseManager`] ties the three storage subsystems together: the
//! pager that owns the data file, the write-ahead log that makes writes
//! durable before the data file sees them, and an LRU cache of decoded
//! page bodies.
//!
//! A write logs pre- and post-images to the log and mutates only the
//! cache; the data file catches up when a checkpoint flushes every
//! log-pending page and rotates the log. A read serves from the cache, or
//! from disk with the log's post-images overlaid — so readers always see
//! the latest committed state no matter how stale the data file is.
//!
//! # Example
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use cinder_db::{DatabaseConfig, DatabaseManager, PageDelta, PageType};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut db = DatabaseManager::open(DatabaseConfig::in_dir("."))?;
//!     let page = db.allocate_page(PageType::User)?;
//!     db.write_pages(&[PageDelta::new(page, 0, Bytes::from_static(b"hello"))])?;
//!     assert_eq!(&db.get_page(page)?[..5], b"hello");
//!     db.shutdown()?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

mod error;
mod manager;

pub use error::{DbError, DbResult};
pub use manager::{DatabaseManager, PageDelta};

pub use cinder_common::config::DatabaseConfig;
pub use cinder_common::types::{PageId, TxnId};
pub use cinder_storage::PageType;
