use crate::errors::{ExError, ExErrorKind, ScdxError};
use crate::model::{ActiveRecordRef, Mutation, MutationPlan, RecordId, VersionedRecord};
use crate::run::RunContext;
use crate::store::{ScopeFilter, VersionStore};

/// In-memory versioned store
///
/// A Vec-backed implementation of [`VersionStore`] holding records in
/// insertion order. Not thread-safe (no Arc/RwLock), designed for tests and
/// single-threaded embedding.
///
/// Batches are applied to a copy of the record list which replaces the live
/// list only when every mutation succeeded, so a failed batch leaves the
/// store exactly as it was.
#[derive(Debug, Clone, Default)]
pub struct MemoryVersionStore {
    records: Vec<VersionedRecord>,
    fail_next_batch: Option<String>,
    batches_applied: usize,
}

impl MemoryVersionStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record directly, bypassing reconciliation (test setup)
    pub fn seed(&mut self, record: VersionedRecord) {
        self.records.push(record);
    }

    /// All records, active and expired, in insertion order
    pub fn records(&self) -> &[VersionedRecord] {
        &self.records
    }

    /// Active records of a collection, in insertion order
    pub fn active(&self, collection: &str) -> Vec<&VersionedRecord> {
        self.records
            .iter()
            .filter(|r| r.collection == collection && r.is_active())
            .collect()
    }

    /// Look up a record by id
    pub fn get(&self, id: &RecordId) -> Option<&VersionedRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// Make the next `apply_batch` call fail with `StoreTransaction`
    pub fn fail_next_batch(&mut self, reason: impl Into<String>) {
        self.fail_next_batch = Some(reason.into());
    }

    /// Number of batches committed so far (dry runs and empty plans never count)
    pub fn batches_applied(&self) -> usize {
        self.batches_applied
    }

    fn apply_mutation(
        records: &mut Vec<VersionedRecord>,
        collection: &str,
        mutation: &Mutation,
    ) -> Result<(), ScdxError> {
        match mutation {
            Mutation::Insert(doc) => {
                records.push(VersionedRecord {
                    id: RecordId::generate(),
                    collection: collection.to_string(),
                    hash: doc.hash.clone(),
                    key: doc.key.clone(),
                    payload: doc.payload.clone(),
                    start_ts: doc.start_ts,
                    end_ts: None,
                    updated_ts: None,
                });
            }
            Mutation::UpdatePayload { id, payload, at } => {
                let record = Self::active_mut(records, id)?;
                record.payload = payload.clone();
                record.updated_ts = Some(*at);
            }
            Mutation::Expire { id, at } => {
                let record = Self::active_mut(records, id)?;
                record.end_ts = Some((*at).max(record.start_ts));
            }
        }
        Ok(())
    }

    fn active_mut<'a>(
        records: &'a mut [VersionedRecord],
        id: &RecordId,
    ) -> Result<&'a mut VersionedRecord, ScdxError> {
        let record = records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| ScdxError::RecordNotFound {
                record_id: id.to_string(),
            })?;
        if !record.is_active() {
            return Err(ScdxError::RecordNotActive {
                record_id: id.to_string(),
            });
        }
        Ok(record)
    }
}

impl VersionStore for MemoryVersionStore {
    fn load_active(
        &mut self,
        scope: &ScopeFilter,
        ctx: &RunContext,
    ) -> Result<Vec<ActiveRecordRef>, ExError> {
        ctx.check("load_active")?;
        let mut active: Vec<&VersionedRecord> = self
            .records
            .iter()
            .filter(|r| r.is_active() && scope.matches(r))
            .collect();
        // Stable sort keeps insertion order among equal start times
        active.sort_by_key(|r| r.start_ts);
        Ok(active
            .into_iter()
            .map(|r| ActiveRecordRef {
                id: r.id.clone(),
                hash: r.hash.clone(),
                key: r.key.clone(),
            })
            .collect())
    }

    fn apply_batch(
        &mut self,
        collection: &str,
        plan: &MutationPlan,
        ctx: &RunContext,
    ) -> Result<usize, ExError> {
        ctx.check("apply_batch")?;

        if let Some(reason) = self.fail_next_batch.take() {
            return Err(ExError::new(ExErrorKind::StoreTransaction)
                .with_op("apply_batch")
                .with_collection(collection)
                .with_message(reason));
        }

        let mut staged = self.records.clone();
        for mutation in plan {
            Self::apply_mutation(&mut staged, collection, mutation).map_err(|e| {
                ExError::from(e)
                    .with_op("apply_batch")
                    .with_collection(collection)
            })?;
        }

        self.records = staged;
        self.batches_applied += 1;
        Ok(plan.len())
    }
}
