#![allow(dead_code)]
//! Shared helpers for scdx-core integration tests

use chrono::{DateTime, Duration, Utc};
use scdx_core::{
    compute_hash, execute_plan, load_active_index, reconcile, DesiredEntry, ExecutionOutcome,
    HashingConfig, MemoryVersionStore, PartitionKey, ReconcileConfig, Reconciliation, RecordId,
    RunContext, ScopeFilter, VersionedRecord,
};
use serde_json::Value;

pub const COLLECTION: &str = "products";

pub fn entry(value: Value) -> DesiredEntry {
    DesiredEntry::from_value(value, 0).unwrap()
}

pub fn entries(values: Vec<Value>) -> Vec<DesiredEntry> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| DesiredEntry::from_value(v, i).unwrap())
        .collect()
}

/// An active record whose hash is computed from `payload` under `hashing`
pub fn active_record(
    id: &str,
    payload: Value,
    hashing: &HashingConfig,
    start_ts: DateTime<Utc>,
) -> VersionedRecord {
    let payload = entry(payload);
    VersionedRecord {
        id: RecordId::new(id),
        collection: COLLECTION.to_string(),
        hash: compute_hash(&payload, hashing).unwrap(),
        key: PartitionKey::default(),
        payload,
        start_ts,
        end_ts: None,
        updated_ts: None,
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc::now() - Duration::hours(1)
}

/// Run load, reconcile and execute against a memory store
pub fn run_once(
    store: &mut MemoryVersionStore,
    desired: &[DesiredEntry],
    config: &ReconcileConfig,
    dry_run: bool,
) -> (Reconciliation, ExecutionOutcome) {
    let ctx = RunContext::new();
    let scope = ScopeFilter::collection(COLLECTION);
    let mut index = load_active_index(store, &scope, &ctx).unwrap();
    let result = reconcile(desired, &mut index, config, ctx.now).unwrap();
    let outcome = execute_plan(store, COLLECTION, &result.plan, dry_run, &ctx).unwrap();
    (result, outcome)
}
