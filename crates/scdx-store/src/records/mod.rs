//! Versioned record persistence
//!
//! ## Responsibilities
//!
//! - Row mapping between `versioned_records` and [`VersionedRecord`]
//! - Scoped active-record loads and read-only history queries ([`query`])
//! - Guarded, transactional application of mutation plans ([`persist`])
//!
//! Timestamps are stored as epoch milliseconds; payloads as JSON text.

#![allow(clippy::result_large_err)]

pub mod persist;
pub mod query;

use chrono::{DateTime, TimeZone, Utc};
use scdx_core::{ContentHash, DesiredEntry, PartitionKey, RecordId, VersionedRecord};

pub(crate) const RECORD_COLUMNS: &str =
    "id, collection, hash, key, payload, start_ts, end_ts, updated_ts";

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single().ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Integer,
            format!("timestamp out of range: {}", ms).into(),
        )
    })
}

/// Map a row selected with [`RECORD_COLUMNS`]
pub(crate) fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<VersionedRecord> {
    let payload: String = row.get(4)?;
    let payload: DesiredEntry = serde_json::from_str(&payload).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(VersionedRecord {
        id: RecordId::new(row.get::<_, String>(0)?),
        collection: row.get(1)?,
        hash: ContentHash::new(row.get::<_, String>(2)?),
        key: PartitionKey::new(row.get::<_, String>(3)?),
        payload,
        start_ts: from_millis(row.get(5)?, 5)?,
        end_ts: row
            .get::<_, Option<i64>>(6)?
            .map(|ms| from_millis(ms, 6))
            .transpose()?,
        updated_ts: row
            .get::<_, Option<i64>>(7)?
            .map(|ms| from_millis(ms, 7))
            .transpose()?,
    })
}
