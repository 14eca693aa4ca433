//! Error handling for scdx-store
//!
//! Wraps scdx-core ExError with store-specific helpers

use scdx_core::errors::{ExError, ExErrorKind};
use scdx_core::RunContext;
use std::path::Path;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// The store at `path` cannot be opened or configured
pub fn connection_error(path: &Path, err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::StoreConnection)
        .with_op("open_store")
        .with_message(format!("Cannot open store at {}: {}", path.display(), err))
}

/// Map a statement error raised while `ctx` governed the connection.
///
/// An interrupted statement becomes `Cancelled` or `Timeout` depending on
/// what tripped the progress handler; anything else becomes `fallback`.
pub fn from_rusqlite_in_run(
    err: rusqlite::Error,
    ctx: &RunContext,
    op: &str,
    fallback: ExErrorKind,
) -> ExError {
    if is_interrupt(&err) {
        let kind = if ctx.is_cancelled() {
            ExErrorKind::Cancelled
        } else {
            ExErrorKind::Timeout
        };
        return ctx.interrupted(kind, op);
    }
    ExError::new(fallback)
        .with_op(op)
        .with_message(err.to_string())
}

fn is_interrupt(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::OperationInterrupted
    )
}
