//! # cinder-common
//!
//! Shared foundation for the Cinder storage engine:
//!
//! - **Types**: typed identifiers (`PageId`, `TxnId`)
//! - **Constants**: the on-disk page layout and engine defaults
//! - **Config**: the [`DatabaseConfig`] consumed by the database manager
//!
//! Every other Cinder crate depends on this one; it depends on nothing but
//! `serde`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod constants;
pub mod types;

pub use config::DatabaseConfig;
pub use types::{PageId, TxnId};
