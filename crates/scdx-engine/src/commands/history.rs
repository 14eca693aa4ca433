//! Read-only history commands and schema provisioning.

#![allow(clippy::result_large_err)]

use crate::commands::reconcile::open_store;
use crate::config::RunConfig;
use chrono::{DateTime, Utc};
use scdx_core::errors::{ExError, ExErrorKind};
use scdx_core::VersionedRecord;
use scdx_store::migrations::applied_migrations;

fn require_collection(collection: &str, op: &str) -> Result<(), ExError> {
    if collection.trim().is_empty() {
        return Err(ExError::from(scdx_core::ScdxError::MissingCollection).with_op(op));
    }
    Ok(())
}

/// Every version of `collection`, optionally one partition key, oldest first
///
/// # Errors
///
/// `Configuration`, `StoreConnection`, or `Persistence` on query failure.
pub fn history(
    config: &RunConfig,
    collection: &str,
    key: Option<&str>,
) -> Result<Vec<VersionedRecord>, ExError> {
    require_collection(collection, "history")?;
    let store = open_store(config)?;
    let records = store
        .list_history(collection, key)
        .map_err(|e| e.with_op("history").with_collection(collection))?;
    tracing::debug!(collection = %collection, "Loaded {} versions", records.len());
    Ok(records)
}

/// Records of `collection` valid at `at`
///
/// # Errors
///
/// `Configuration`, `StoreConnection`, or `Persistence` on query failure.
pub fn as_of(
    config: &RunConfig,
    collection: &str,
    at: DateTime<Utc>,
) -> Result<Vec<VersionedRecord>, ExError> {
    require_collection(collection, "as_of")?;
    let store = open_store(config)?;
    store
        .load_as_of(collection, at)
        .map_err(|e| e.with_op("as_of").with_collection(collection))
}

/// Provision the schema and list the applied migrations
///
/// # Errors
///
/// `Configuration` or `StoreConnection`.
pub fn migrate(config: &RunConfig) -> Result<Vec<String>, ExError> {
    let store = open_store(config)?;
    applied_migrations(store.connection())
        .map_err(|e| e.reclassify(ExErrorKind::StoreConnection, "migrate"))
}
