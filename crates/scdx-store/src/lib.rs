//! SCDX Store - SQLite persistence for Type-2 history
//!
//! Provides:
//! - SQLite schema with an embedded, checksummed migrations framework
//! - [`SqliteVersionStore`], the production [`scdx_core::VersionStore`]
//! - Read-only history queries (full history, as-of snapshots)

pub mod db;
pub mod errors;
pub mod migrations;
pub mod records;
pub mod store;

// Re-export key types
pub use errors::Result;
pub use store::{SqliteVersionStore, StoreOptions};
