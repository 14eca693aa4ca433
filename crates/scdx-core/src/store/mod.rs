//! Store contract required by the reconciler.
//!
//! ## Responsibilities
//!
//! - Define [`VersionStore`], the seam between the pure core and a concrete
//!   persistence engine
//! - Define [`ScopeFilter`], the predicate selecting which active records a
//!   run owns
//! - Provide [`MemoryVersionStore`] for tests and embedding
//!
//! ## Non-Responsibilities
//!
//! - SQLite persistence (handled by `scdx-store`)
//! - Run orchestration (handled by `scdx-engine`)

pub mod memory;

pub use memory::MemoryVersionStore;

use crate::errors::{ExError, Result, ScdxError};
use crate::model::{ActiveRecordRef, MutationPlan, PartitionKey, VersionedRecord};
use crate::run::RunContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Versioned store implementing Type-2 history
///
/// Implementations must:
/// - return active records ordered by `start_ts` ascending, then insertion
///   order, so the earliest record of a duplicate group comes first
/// - apply a batch all-or-nothing
/// - assign a fresh unique id to every inserted record
/// - refuse to mutate a record that is no longer active
pub trait VersionStore {
    /// Load `{id, hash, key}` of every active record matching the scope.
    ///
    /// # Errors
    ///
    /// `Persistence` on store failure, `Timeout`/`Cancelled` when the run is
    /// interrupted.
    fn load_active(
        &mut self,
        scope: &ScopeFilter,
        ctx: &RunContext,
    ) -> std::result::Result<Vec<ActiveRecordRef>, ExError>;

    /// Apply a plan as one atomic transaction and return the number of
    /// mutations applied.
    ///
    /// # Errors
    ///
    /// `StoreTransaction` when the batch fails; nothing is persisted.
    fn apply_batch(
        &mut self,
        collection: &str,
        plan: &MutationPlan,
        ctx: &RunContext,
    ) -> std::result::Result<usize, ExError>;
}

/// Predicate selecting the active records owned by a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeFilter {
    pub collection: String,
    /// Restrict to these partition keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<PartitionKey>>,
    /// Top-level payload field equality; `null` matches absent or null
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub payload: BTreeMap<String, Value>,
}

impl ScopeFilter {
    /// Every active record of a collection
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            keys: None,
            payload: BTreeMap::new(),
        }
    }

    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = Some(keys.into_iter().map(|k| PartitionKey::new(k)).collect());
        self
    }

    pub fn with_payload_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.payload.insert(field.into(), value);
        self
    }

    /// # Errors
    ///
    /// `MissingCollection` for an empty collection, `InvalidScopePredicate`
    /// for array/object predicates or empty field names.
    pub fn validate(&self) -> Result<()> {
        if self.collection.trim().is_empty() {
            return Err(ScdxError::MissingCollection);
        }
        for (field, value) in &self.payload {
            if field.is_empty() {
                return Err(ScdxError::InvalidScopePredicate {
                    field: field.clone(),
                    reason: "field name is empty".to_string(),
                });
            }
            if value.is_array() || value.is_object() {
                return Err(ScdxError::InvalidScopePredicate {
                    field: field.clone(),
                    reason: "only scalar values are supported".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Evaluate the filter against a record (activity is checked separately)
    pub fn matches(&self, record: &VersionedRecord) -> bool {
        if record.collection != self.collection {
            return false;
        }
        if let Some(keys) = &self.keys {
            if !keys.contains(&record.key) {
                return false;
            }
        }
        self.payload
            .iter()
            .all(|(field, expected)| scalar_matches(expected, record.payload.get(field)))
    }
}

fn scalar_matches(expected: &Value, actual: Option<&Value>) -> bool {
    match (expected, actual) {
        (Value::Null, None) | (Value::Null, Some(Value::Null)) => true,
        (Value::Number(e), Some(Value::Number(a))) => e.as_f64() == a.as_f64(),
        (e, Some(a)) => e == a,
        _ => false,
    }
}
