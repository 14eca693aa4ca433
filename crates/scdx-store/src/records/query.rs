//! Read-only record queries.
//!
//! Provides the scoped active-record load used to build the run's index, plus
//! history lookups over closed and open versions.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::records::{record_from_row, to_millis, RECORD_COLUMNS};
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension};
use scdx_core::{ActiveRecordRef, ContentHash, PartitionKey, RecordId, ScopeFilter, VersionedRecord};
use serde_json::Value;

/// SQL and bound parameters for a scope filter
struct ScopeQuery {
    sql: String,
    params: Vec<SqlValue>,
}

/// JSON path addressing a top-level payload field
fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

/// Predicate on `json_extract(payload, path)` for one expected scalar.
///
/// `json_extract` renders JSON booleans as 0/1, so booleans are matched on
/// `json_type` and numbers are restricted to numeric JSON types.
fn scalar_predicate(path: String, value: &Value) -> (&'static str, Vec<SqlValue>) {
    match value {
        Value::Null => (
            " AND json_extract(payload, ?) IS NULL",
            vec![SqlValue::Text(path)],
        ),
        Value::Bool(b) => (
            " AND json_type(payload, ?) = ?",
            vec![SqlValue::Text(path), SqlValue::Text(b.to_string())],
        ),
        Value::Number(n) => {
            let number = match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
            };
            (
                " AND json_type(payload, ?) IN ('integer', 'real') AND json_extract(payload, ?) = ?",
                vec![SqlValue::Text(path.clone()), SqlValue::Text(path), number],
            )
        }
        Value::String(s) => (
            " AND json_type(payload, ?) = 'text' AND json_extract(payload, ?) = ?",
            vec![
                SqlValue::Text(path.clone()),
                SqlValue::Text(path),
                SqlValue::Text(s.clone()),
            ],
        ),
        // Rejected by ScopeFilter::validate
        Value::Array(_) | Value::Object(_) => (" AND 0", Vec::new()),
    }
}

fn build_scope_query(scope: &ScopeFilter) -> ScopeQuery {
    let mut sql = String::from("SELECT id, hash, key FROM active_records WHERE collection = ?");
    let mut params = vec![SqlValue::Text(scope.collection.clone())];

    if let Some(keys) = &scope.keys {
        if keys.is_empty() {
            sql.push_str(" AND 0");
        } else {
            let placeholders = vec!["?"; keys.len()].join(", ");
            sql.push_str(&format!(" AND key IN ({})", placeholders));
            params.extend(keys.iter().map(|k| SqlValue::Text(k.as_str().to_string())));
        }
    }

    for (field, expected) in &scope.payload {
        let (predicate, bound) = scalar_predicate(json_path(field), expected);
        sql.push_str(predicate);
        params.extend(bound);
    }

    sql.push_str(" ORDER BY start_ts ASC, seq ASC");
    ScopeQuery { sql, params }
}

/// Load `{id, hash, key}` of the active records matching `scope`, earliest
/// `start_ts` first, ties broken by insertion order.
///
/// # Errors
///
/// Returns the raw `rusqlite::Error` so the caller can tell an interrupted
/// statement apart from a failed one.
pub fn load_active(
    conn: &Connection,
    scope: &ScopeFilter,
) -> std::result::Result<Vec<ActiveRecordRef>, rusqlite::Error> {
    let query = build_scope_query(scope);
    let mut stmt = conn.prepare(&query.sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(query.params.iter()), |row| {
        Ok(ActiveRecordRef {
            id: RecordId::new(row.get::<_, String>(0)?),
            hash: ContentHash::new(row.get::<_, String>(1)?),
            key: PartitionKey::new(row.get::<_, String>(2)?),
        })
    })?;
    rows.collect()
}

/// Every version of a collection (optionally one partition key), oldest first.
///
/// # Errors
///
/// - `Persistence`: SQLite query failed
pub fn list_history(
    conn: &Connection,
    collection: &str,
    key: Option<&str>,
) -> Result<Vec<VersionedRecord>> {
    let sql = format!(
        "SELECT {} FROM versioned_records
         WHERE collection = ?1 AND (?2 IS NULL OR key = ?2)
         ORDER BY start_ts ASC, seq ASC",
        RECORD_COLUMNS
    );
    let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
    let records = stmt
        .query_map(rusqlite::params![collection, key], record_from_row)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(records)
}

/// Records of a collection that were valid at instant `at`.
///
/// A record is valid on the half-open interval `[start_ts, end_ts)`.
///
/// # Errors
///
/// - `Persistence`: SQLite query failed
pub fn load_as_of(
    conn: &Connection,
    collection: &str,
    at: DateTime<Utc>,
) -> Result<Vec<VersionedRecord>> {
    let sql = format!(
        "SELECT {} FROM versioned_records
         WHERE collection = ?1 AND start_ts <= ?2 AND (end_ts IS NULL OR end_ts > ?2)
         ORDER BY start_ts ASC, seq ASC",
        RECORD_COLUMNS
    );
    let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
    let records = stmt
        .query_map(rusqlite::params![collection, to_millis(at)], record_from_row)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(records)
}

/// Fetch one record by id, active or not
///
/// # Errors
///
/// - `Persistence`: SQLite query failed
pub fn get_record(conn: &Connection, id: &RecordId) -> Result<Option<VersionedRecord>> {
    let sql = format!("SELECT {} FROM versioned_records WHERE id = ?1", RECORD_COLUMNS);
    conn.query_row(&sql, [id.as_str()], record_from_row)
        .optional()
        .map_err(from_rusqlite)
}

/// Number of active records in a collection
///
/// # Errors
///
/// - `Persistence`: SQLite query failed
/// Whether the records table has been provisioned
pub fn is_provisioned(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'versioned_records'",
            [],
            |row| row.get(0),
        )
        .map_err(from_rusqlite)?;
    Ok(count > 0)
}

pub fn count_active(conn: &Connection, collection: &str) -> Result<usize> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM active_records WHERE collection = ?1",
            [collection],
            |row| row.get(0),
        )
        .map_err(from_rusqlite)?;
    Ok(usize::try_from(count).unwrap_or(0))
}
