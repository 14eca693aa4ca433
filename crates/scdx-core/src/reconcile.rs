//! Reconciliation of a desired snapshot against the active record index.
//!
//! The core entry point is [`reconcile`]. It is pure: no I/O, no clock. The
//! caller supplies `now` and the run's index; the result is the ordered
//! mutation plan and its stats.
//!
//! ## Algorithm
//!
//! For each desired entry, in input order:
//!
//! 1. Compute its content hash and partition key.
//! 2. If the index holds a group for the hash, remove the whole group.
//!    Under field-mutation mode the first id gets `UpdatePayload`; otherwise
//!    it is left alone. Every other id of the group is expired.
//! 3. Without a matching group, emit `Insert`.
//!
//! Ids never matched are expired at the end, in load order.
//!
//! Consuming the whole group on a match collapses duplicate active records
//! back to one canonical record whenever their hash reappears.

use crate::errors::Result;
use crate::hashing::{compute_hash, HashingConfig};
use crate::index::ActiveRecordIndex;
use crate::keying::{compute_key, FieldKeying, KeyingStrategy};
use crate::model::{DesiredEntry, Mutation, MutationPlan, NewRecord, Stats};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Hashing and keying configuration of a run
#[derive(Clone, Default)]
pub struct ReconcileConfig {
    pub hashing: HashingConfig,
    /// `None` keys every entry as `"default"`
    pub keying: Option<Arc<dyn KeyingStrategy>>,
}

impl ReconcileConfig {
    pub fn new(hashing: HashingConfig) -> Self {
        Self {
            hashing,
            keying: None,
        }
    }

    pub fn with_keying(mut self, keying: impl KeyingStrategy + 'static) -> Self {
        self.keying = Some(Arc::new(keying));
        self
    }

    /// Key entries by the given top-level fields
    ///
    /// # Errors
    ///
    /// Returns `EmptyKeyingFields` when `fields` is empty.
    pub fn with_key_fields<I, S>(self, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.with_keying(FieldKeying::new(fields)?))
    }

    pub fn field_mutation_enabled(&self) -> bool {
        self.hashing.field_mutation_enabled()
    }
}

impl std::fmt::Debug for ReconcileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileConfig")
            .field("hashing", &self.hashing)
            .field(
                "keying",
                &self
                    .keying
                    .as_ref()
                    .map_or_else(|| "default".to_string(), |k| k.describe()),
            )
            .finish()
    }
}

/// Plan and stats produced by one reconciliation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reconciliation {
    pub plan: MutationPlan,
    pub stats: Stats,
}

/// Compute the mutations that bring the active set in line with `desired`.
///
/// Every id in `index` is consumed: matched groups during the pass, the
/// rest by the final expiry sweep. The index is empty on return.
///
/// A desired entry whose hash was already consumed earlier in the same run
/// is inserted.
///
/// # Errors
///
/// Returns `ScdxError::Serialization` if an entry cannot be hashed; the
/// index is left partially consumed in that case and must be discarded.
pub fn reconcile(
    desired: &[DesiredEntry],
    index: &mut ActiveRecordIndex,
    config: &ReconcileConfig,
    now: DateTime<Utc>,
) -> Result<Reconciliation> {
    let mut plan = MutationPlan::new();
    let mut stats = Stats::new();
    let field_mutation = config.field_mutation_enabled();

    for entry in desired {
        let hash = compute_hash(entry, &config.hashing)?;

        match index.take_group(&hash) {
            Some(group) => {
                let mut ids = group.into_iter();
                if let Some(canonical) = ids.next() {
                    // Whole-entry hashes match byte-identical payloads; the
                    // canonical record stays as it is.
                    if field_mutation {
                        plan.push(Mutation::UpdatePayload {
                            id: canonical,
                            payload: entry.clone(),
                            at: now,
                        });
                        stats.record_update();
                    }
                }
                let mut expired = 0;
                for id in ids {
                    plan.push(Mutation::Expire { id, at: now });
                    expired += 1;
                }
                stats.record_deletes(expired);
            }
            None => {
                let key = compute_key(entry, config.keying.as_deref());
                plan.push(Mutation::Insert(NewRecord {
                    hash,
                    key,
                    payload: entry.clone(),
                    start_ts: now,
                }));
                stats.record_insert();
            }
        }
    }

    let leftovers = index.drain_remaining();
    stats.record_deletes(leftovers.len());
    for id in leftovers {
        plan.push(Mutation::Expire { id, at: now });
    }

    Ok(Reconciliation { plan, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActiveRecordRef, ContentHash, PartitionKey, RecordId};
    use serde_json::{json, Value};

    fn entry(value: Value) -> DesiredEntry {
        DesiredEntry::from_value(value, 0).unwrap()
    }

    fn active(id: &str, hash: ContentHash) -> ActiveRecordRef {
        ActiveRecordRef {
            id: RecordId::new(id),
            hash,
            key: PartitionKey::default(),
        }
    }

    #[test]
    fn test_insert_uses_configured_key() {
        let config = ReconcileConfig::default()
            .with_key_fields(["region"])
            .unwrap();
        let mut index = ActiveRecordIndex::new();
        let now = Utc::now();

        let result = reconcile(&[entry(json!({"region": "eu"}))], &mut index, &config, now).unwrap();

        match &result.plan.as_slice()[0] {
            Mutation::Insert(doc) => {
                assert_eq!(doc.key.as_str(), "eu");
                assert_eq!(doc.start_ts, now);
            }
            other => panic!("expected insert, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_desired_hash_inserts_second_copy() {
        let config = ReconcileConfig::default();
        let e = entry(json!({"v": "x"}));
        let hash = compute_hash(&e, &config.hashing).unwrap();
        let mut index = ActiveRecordIndex::from_records(vec![active("r1", hash)]);

        let result = reconcile(&[e.clone(), e], &mut index, &config, Utc::now()).unwrap();

        assert_eq!(result.stats, Stats { insert: 1, update: 0, delete: 0 });
        assert!(matches!(result.plan.as_slice()[0], Mutation::Insert(_)));
    }

    #[test]
    fn test_whole_entry_match_expires_duplicates_only() {
        let config = ReconcileConfig::default();
        let e = entry(json!({"v": "x"}));
        let hash = compute_hash(&e, &config.hashing).unwrap();
        let mut index = ActiveRecordIndex::from_records(vec![
            active("r1", hash.clone()),
            active("r2", hash.clone()),
            active("r3", hash),
        ]);
        let now = Utc::now();

        let result = reconcile(&[e], &mut index, &config, now).unwrap();

        assert_eq!(
            result.plan.as_slice(),
            &[
                Mutation::Expire { id: RecordId::new("r2"), at: now },
                Mutation::Expire { id: RecordId::new("r3"), at: now },
            ]
        );
        assert_eq!(result.stats, Stats { insert: 0, update: 0, delete: 2 });
    }

    #[test]
    fn test_index_fully_consumed() {
        let config = ReconcileConfig::default();
        let mut index = ActiveRecordIndex::from_records(vec![
            active("r1", ContentHash::new("a")),
            active("r2", ContentHash::new("b")),
        ]);

        reconcile(&[], &mut index, &config, Utc::now()).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_debug_shows_keying_description() {
        let config = ReconcileConfig::new(HashingConfig::pick(["v"]))
            .with_key_fields(["a", "b"])
            .unwrap();
        let text = format!("{:?}", config);
        assert!(text.contains("fields(a,b)"));
    }
}
