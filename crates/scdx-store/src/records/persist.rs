//! Mutation plan persistence.
//!
//! Every mutation of a plan is written inside one caller-owned transaction.
//! Updates and expiries only touch rows that are still active; a guard that
//! matches no row aborts the plan so the caller's transaction rolls back.
//! An expiry never ends a version before it started: a record whose
//! `start_ts` lies ahead of the run clock is closed at its own `start_ts`.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite_in_run, Result};
use crate::records::to_millis;
use rusqlite::{OptionalExtension, Transaction};
use scdx_core::errors::{ExError, ExErrorKind, ScdxError};
use scdx_core::{Mutation, MutationPlan, NewRecord, RecordId, RunContext};

const OP: &str = "apply_batch";

/// Write every mutation of `plan` through `tx`, in plan order.
///
/// Returns the number of mutations written. Does not commit.
///
/// # Errors
///
/// - `StoreTransaction`: a statement failed or a target was not active
/// - `Timeout` / `Cancelled`: the progress handler interrupted a statement
pub fn apply_plan(
    tx: &Transaction<'_>,
    collection: &str,
    plan: &MutationPlan,
    ctx: &RunContext,
) -> Result<usize> {
    let map = |e: rusqlite::Error| from_rusqlite_in_run(e, ctx, OP, ExErrorKind::StoreTransaction);

    let mut insert = tx
        .prepare_cached(
            "INSERT INTO versioned_records (id, collection, hash, key, payload, start_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(map)?;
    let mut update = tx
        .prepare_cached(
            "UPDATE versioned_records SET payload = ?1, updated_ts = ?2
             WHERE id = ?3 AND collection = ?4 AND end_ts IS NULL",
        )
        .map_err(map)?;
    let mut expire = tx
        .prepare_cached(
            "UPDATE versioned_records SET end_ts = MAX(?1, start_ts)
             WHERE id = ?2 AND collection = ?3 AND end_ts IS NULL",
        )
        .map_err(map)?;

    for mutation in plan {
        match mutation {
            Mutation::Insert(doc) => {
                insert
                    .execute(rusqlite::params![
                        RecordId::generate().as_str(),
                        collection,
                        doc.hash.as_str(),
                        doc.key.as_str(),
                        payload_json(doc)?,
                        to_millis(doc.start_ts),
                    ])
                    .map_err(map)?;
            }
            Mutation::UpdatePayload { id, payload, at } => {
                let payload = serde_json::to_string(payload).map_err(|e| {
                    ExError::from(ScdxError::from(e))
                        .with_op(OP)
                        .with_entity_id(id.as_str())
                })?;
                let changed = update
                    .execute(rusqlite::params![payload, to_millis(*at), id.as_str(), collection])
                    .map_err(map)?;
                if changed == 0 {
                    return Err(inactive_target(tx, collection, id, ctx));
                }
            }
            Mutation::Expire { id, at } => {
                let changed = expire
                    .execute(rusqlite::params![to_millis(*at), id.as_str(), collection])
                    .map_err(map)?;
                if changed == 0 {
                    return Err(inactive_target(tx, collection, id, ctx));
                }
            }
        }
    }

    Ok(plan.len())
}

fn payload_json(doc: &NewRecord) -> Result<String> {
    serde_json::to_string(&doc.payload).map_err(|e| ExError::from(ScdxError::from(e)).with_op(OP))
}

/// Explain why a guarded mutation matched no row
fn inactive_target(
    tx: &Transaction<'_>,
    collection: &str,
    id: &RecordId,
    ctx: &RunContext,
) -> ExError {
    let exists = tx
        .query_row(
            "SELECT 1 FROM versioned_records WHERE id = ?1 AND collection = ?2",
            rusqlite::params![id.as_str(), collection],
            |_| Ok(()),
        )
        .optional();

    let err = match exists {
        Ok(Some(())) => ScdxError::RecordNotActive {
            record_id: id.to_string(),
        },
        Ok(None) => ScdxError::RecordNotFound {
            record_id: id.to_string(),
        },
        Err(e) => return from_rusqlite_in_run(e, ctx, OP, ExErrorKind::StoreTransaction),
    };
    ExError::from(err).with_op(OP).with_collection(collection)
}
