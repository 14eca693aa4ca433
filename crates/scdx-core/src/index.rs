//! Active record index
//!
//! In-memory snapshot of the store's active records for one run, keyed by
//! content hash. Groups with more than one id are duplicate active records
//! sharing a hash; the first id of a group (earliest `start_ts`) is the
//! canonical one.
//!
//! Groups are kept in load order so that the ids left over after
//! reconciliation are expired in a deterministic order.

use crate::errors::ExError;
use crate::model::{ActiveRecordRef, ContentHash, RecordId};
use crate::run::RunContext;
use crate::store::{ScopeFilter, VersionStore};
use crate::{log_op_end, log_op_error, log_op_start};
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone)]
struct IdGroup {
    hash: ContentHash,
    ids: Vec<RecordId>,
}

/// Mapping from content hash to the ordered ids of active records
#[derive(Debug, Clone, Default)]
pub struct ActiveRecordIndex {
    /// Groups in first-seen order; `None` once consumed
    slots: Vec<Option<IdGroup>>,
    /// Slot of every inserted id, in load order
    order: Vec<usize>,
    by_hash: HashMap<ContentHash, usize>,
    remaining: usize,
}

impl ActiveRecordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from records in store order
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ActiveRecordRef>,
    {
        let mut index = Self::new();
        for record in records {
            index.insert(record.hash, record.id);
        }
        index
    }

    /// Append an id to its hash group, creating the group if needed
    pub fn insert(&mut self, hash: ContentHash, id: RecordId) {
        let slot = match self.by_hash.get(&hash) {
            Some(&slot) => {
                if let Some(group) = self.slots[slot].as_mut() {
                    group.ids.push(id);
                }
                slot
            }
            None => {
                let slot = self.slots.len();
                self.by_hash.insert(hash.clone(), slot);
                self.slots.push(Some(IdGroup {
                    hash,
                    ids: vec![id],
                }));
                slot
            }
        };
        self.order.push(slot);
        self.remaining += 1;
    }

    /// Check if an unconsumed group exists for the hash
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Remove and return the whole id group for a hash
    pub fn take_group(&mut self, hash: &ContentHash) -> Option<Vec<RecordId>> {
        let slot = self.by_hash.remove(hash)?;
        let group = self.slots[slot].take()?;
        self.remaining -= group.ids.len();
        Some(group.ids)
    }

    /// Remove and return every unconsumed id, in load order
    pub fn drain_remaining(&mut self) -> Vec<RecordId> {
        let mut groups: Vec<std::vec::IntoIter<RecordId>> = self
            .slots
            .drain(..)
            .map(|slot| slot.map(|g| g.ids).unwrap_or_default().into_iter())
            .collect();
        let ids: Vec<RecordId> = self
            .order
            .drain(..)
            .filter_map(|slot| groups[slot].next())
            .collect();
        self.by_hash.clear();
        self.remaining = 0;
        ids
    }

    /// Number of unconsumed record ids
    pub fn len(&self) -> usize {
        self.remaining
    }

    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    /// Number of unconsumed hash groups
    pub fn group_count(&self) -> usize {
        self.by_hash.len()
    }

    /// Unconsumed groups holding more than one id
    pub fn duplicate_hashes(&self) -> Vec<&ContentHash> {
        self.slots
            .iter()
            .flatten()
            .filter(|g| g.ids.len() > 1)
            .map(|g| &g.hash)
            .collect()
    }
}

/// Load the active records in scope and build the run's index.
///
/// An empty result is not an error; it is logged and yields an empty index.
///
/// # Errors
///
/// Propagates store failures (`Persistence`, `Timeout`, `Cancelled`).
pub fn load_active_index(
    store: &mut dyn VersionStore,
    scope: &ScopeFilter,
    ctx: &RunContext,
) -> Result<ActiveRecordIndex, ExError> {
    let started = Instant::now();
    log_op_start!(
        "load_active_index",
        run_id = %ctx.run_id,
        collection = %scope.collection
    );

    let records = match store.load_active(scope, ctx) {
        Ok(records) => records,
        Err(e) => {
            let e = ctx.annotate(e.with_collection(scope.collection.clone()));
            log_op_error!(
                "load_active_index",
                e.clone(),
                duration_ms = started.elapsed().as_millis() as u64
            );
            return Err(e);
        }
    };

    if records.is_empty() {
        tracing::info!(collection = %scope.collection, "No existing active entries found");
    } else {
        tracing::info!(
            collection = %scope.collection,
            active_count = records.len(),
            "Found {} existing active entries",
            records.len()
        );
    }

    let index = ActiveRecordIndex::from_records(records);
    let duplicates = index.duplicate_hashes().len();
    if duplicates > 0 {
        tracing::warn!(
            collection = %scope.collection,
            duplicate_groups = duplicates,
            "Active records share a content hash; duplicates will be collapsed when matched"
        );
    }

    log_op_end!(
        "load_active_index",
        duration_ms = started.elapsed().as_millis() as u64,
        collection = %scope.collection,
        active_count = index.len(),
        group_count = index.group_count()
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PartitionKey;

    fn rec(id: &str, hash: &str) -> ActiveRecordRef {
        ActiveRecordRef {
            id: RecordId::new(id),
            hash: ContentHash::new(hash),
            key: PartitionKey::default(),
        }
    }

    #[test]
    fn test_groups_preserve_store_order() {
        let mut index =
            ActiveRecordIndex::from_records(vec![rec("r1", "a"), rec("r2", "b"), rec("r3", "a")]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.group_count(), 2);

        let group = index.take_group(&ContentHash::new("a")).unwrap();
        assert_eq!(group, vec![RecordId::new("r1"), RecordId::new("r3")]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_take_group_consumes_once() {
        let mut index = ActiveRecordIndex::from_records(vec![rec("r1", "a")]);
        assert!(index.take_group(&ContentHash::new("a")).is_some());
        assert!(index.take_group(&ContentHash::new("a")).is_none());
        assert!(!index.contains(&ContentHash::new("a")));
        assert!(index.is_empty());
    }

    #[test]
    fn test_drain_remaining_in_load_order() {
        let mut index = ActiveRecordIndex::from_records(vec![
            rec("r1", "a"),
            rec("r2", "b"),
            rec("r3", "c"),
            rec("r4", "b"),
        ]);
        index.take_group(&ContentHash::new("c"));

        let ids: Vec<String> = index
            .drain_remaining()
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(ids, vec!["r1", "r2", "r4"]);
        assert!(index.is_empty());
        assert_eq!(index.group_count(), 0);
    }

    #[test]
    fn test_drain_interleaves_groups_by_load_position() {
        let mut index =
            ActiveRecordIndex::from_records(vec![rec("r1", "a"), rec("r2", "b"), rec("r3", "a")]);
        let ids: Vec<String> = index
            .drain_remaining()
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);
        assert!(index.is_empty());
        assert_eq!(index.group_count(), 0);
    }

    #[test]
    fn test_duplicate_hashes() {
        let index =
            ActiveRecordIndex::from_records(vec![rec("r1", "a"), rec("r2", "a"), rec("r3", "b")]);
        assert_eq!(index.duplicate_hashes(), vec![&ContentHash::new("a")]);
    }
}
