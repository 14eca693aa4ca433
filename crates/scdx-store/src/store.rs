//! SQLite implementation of the version store
//!
//! [`SqliteVersionStore`] owns one connection. Opening it provisions the
//! schema. Loads and batches run under a progress handler that interrupts
//! the in-flight statement once the run is cancelled or past its deadline;
//! an interrupted batch rolls back with its transaction.

#![allow(clippy::result_large_err)]

use crate::db;
use crate::errors::{from_rusqlite_in_run, Result};
use crate::migrations::apply_migrations;
use crate::records::{persist, query};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use scdx_core::errors::{ExError, ExErrorKind};
use scdx_core::{
    ActiveRecordRef, MutationPlan, RecordId, RunContext, ScopeFilter, VersionStore,
    VersionedRecord,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

/// Virtual machine instructions between two progress handler calls
const PROGRESS_INTERVAL: i32 = 1000;

/// Connection settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Bound on waiting for a locked database
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: db::DEFAULT_BUSY_TIMEOUT,
        }
    }
}

/// Versioned record store backed by a SQLite database
pub struct SqliteVersionStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteVersionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVersionStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteVersionStore {
    /// Open (creating if needed) the store at `path` and apply migrations
    ///
    /// # Errors
    ///
    /// `StoreConnection` when the file cannot be opened, configured or
    /// migrated.
    pub fn open<P: AsRef<Path>>(path: P, options: StoreOptions) -> Result<Self> {
        let path = path.as_ref();
        let conn = db::open(path)?;
        Self::provision(conn, Some(path.to_path_buf()), options)
    }

    /// Open an existing store without writing to it
    ///
    /// Nothing is created or migrated. Returns `Ok(None)` when the file or
    /// its schema does not exist yet; every write through the returned store
    /// fails with `StoreTransaction`.
    ///
    /// # Errors
    ///
    /// `StoreConnection` when the file exists but cannot be opened or read.
    pub fn open_read_only<P: AsRef<Path>>(path: P, options: StoreOptions) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let conn = db::open_read_only(path, options.busy_timeout)?;
        let provisioned = query::is_provisioned(&conn)
            .map_err(|e| e.reclassify(ExErrorKind::StoreConnection, "open_store"))?;
        if !provisioned {
            return Ok(None);
        }

        tracing::debug!(path = ?path, "Opened version store read-only");
        Ok(Some(Self {
            conn,
            path: Some(path.to_path_buf()),
        }))
    }

    /// Open a private in-memory store (tests and dry experiments)
    ///
    /// # Errors
    ///
    /// `StoreConnection` when the schema cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = db::open_in_memory()
            .map_err(|e| e.reclassify(ExErrorKind::StoreConnection, "open_store"))?;
        Self::provision(conn, None, StoreOptions::default())
    }

    fn provision(mut conn: Connection, path: Option<PathBuf>, options: StoreOptions) -> Result<Self> {
        db::configure(&conn, options.busy_timeout)
            .and_then(|_| apply_migrations(&mut conn))
            .map_err(|e| e.reclassify(ExErrorKind::StoreConnection, "open_store"))?;

        tracing::debug!(path = ?path, "Opened version store");
        Ok(Self { conn, path })
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Underlying connection (read-only inspection)
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Every version of a collection, optionally narrowed to one key
    ///
    /// # Errors
    ///
    /// `Persistence` on query failure.
    pub fn list_history(&self, collection: &str, key: Option<&str>) -> Result<Vec<VersionedRecord>> {
        query::list_history(&self.conn, collection, key)
    }

    /// Records of a collection valid at `at`
    ///
    /// # Errors
    ///
    /// `Persistence` on query failure.
    pub fn load_as_of(&self, collection: &str, at: DateTime<Utc>) -> Result<Vec<VersionedRecord>> {
        query::load_as_of(&self.conn, collection, at)
    }

    /// Fetch one record by id
    ///
    /// # Errors
    ///
    /// `Persistence` on query failure.
    pub fn get(&self, id: &RecordId) -> Result<Option<VersionedRecord>> {
        query::get_record(&self.conn, id)
    }

    /// Number of active records in a collection
    ///
    /// # Errors
    ///
    /// `Persistence` on query failure.
    pub fn count_active(&self, collection: &str) -> Result<usize> {
        query::count_active(&self.conn, collection)
    }

    /// Run `f` with the run's cancellation and deadline wired into SQLite
    fn interruptible<T>(
        &mut self,
        ctx: &RunContext,
        f: impl FnOnce(&mut Connection) -> Result<T>,
    ) -> Result<T> {
        let cancelled = ctx.cancel.flag();
        let deadline: Option<Instant> = ctx.deadline;
        self.conn.progress_handler(
            PROGRESS_INTERVAL,
            Some(move || {
                cancelled.load(Ordering::SeqCst) || deadline.is_some_and(|d| Instant::now() >= d)
            }),
        );

        let result = f(&mut self.conn);

        self.conn.progress_handler(0, None::<fn() -> bool>);
        result
    }
}

impl VersionStore for SqliteVersionStore {
    fn load_active(
        &mut self,
        scope: &ScopeFilter,
        ctx: &RunContext,
    ) -> std::result::Result<Vec<ActiveRecordRef>, ExError> {
        ctx.check("load_active")?;
        self.interruptible(ctx, |conn| {
            query::load_active(conn, scope).map_err(|e| {
                from_rusqlite_in_run(e, ctx, "load_active", ExErrorKind::Persistence)
                    .with_collection(scope.collection.clone())
            })
        })
    }

    fn apply_batch(
        &mut self,
        collection: &str,
        plan: &MutationPlan,
        ctx: &RunContext,
    ) -> std::result::Result<usize, ExError> {
        ctx.check("apply_batch")?;
        let map = |e: rusqlite::Error| {
            from_rusqlite_in_run(e, ctx, "apply_batch", ExErrorKind::StoreTransaction)
                .with_collection(collection)
        };

        self.interruptible(ctx, |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map)?;
            // Dropping `tx` on error rolls the whole batch back
            let applied = persist::apply_plan(&tx, collection, plan, ctx)?;
            tx.commit().map_err(map)?;
            Ok(applied)
        })
    }
}
