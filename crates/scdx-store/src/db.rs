//! Database connection management
//!
//! Opens and configures SQLite connections for the store

#![allow(clippy::result_large_err)]

use crate::errors::{connection_error, from_rusqlite, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;

/// Default bound on waiting for a locked database
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Open a SQLite database at the given path
///
/// Missing parent directories are not created. Failures are reported as
/// `StoreConnection`.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    Connection::open(path).map_err(|e| connection_error(path, e))
}

/// Open an existing SQLite database without write access
///
/// Never creates the file and leaves the journal mode alone. Failures are
/// reported as `StoreConnection`.
pub fn open_read_only<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Connection> {
    let path = path.as_ref();
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| connection_error(path, e))?;
    conn.busy_timeout(busy_timeout)
        .map_err(|e| connection_error(path, e))?;
    Ok(conn)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Configure a connection for single-writer batch runs
pub fn configure(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    conn.busy_timeout(busy_timeout).map_err(from_rusqlite)?;

    // WAL lets history readers run while a batch is being written.
    // In-memory databases answer "memory" and keep their journal.
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .map_err(from_rusqlite)?;
    tracing::trace!(journal_mode = %mode, "Configured connection");

    Ok(())
}
