use crate::model::entry::{DesiredEntry, RecordId};
use crate::model::record::NewRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One store mutation produced by reconciliation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Open a new active record
    Insert(NewRecord),
    /// Replace the payload of an active record in place
    UpdatePayload {
        id: RecordId,
        payload: DesiredEntry,
        at: DateTime<Utc>,
    },
    /// Close an active record
    Expire { id: RecordId, at: DateTime<Utc> },
}

impl Mutation {
    /// The run timestamp carried by this mutation
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Mutation::Insert(doc) => doc.start_ts,
            Mutation::UpdatePayload { at, .. } | Mutation::Expire { at, .. } => *at,
        }
    }

    /// Existing record targeted by this mutation (`None` for inserts)
    pub fn target_id(&self) -> Option<&RecordId> {
        match self {
            Mutation::Insert(_) => None,
            Mutation::UpdatePayload { id, .. } | Mutation::Expire { id, .. } => Some(id),
        }
    }

    /// Short operation name for logs
    pub fn op_name(&self) -> &'static str {
        match self {
            Mutation::Insert(_) => "insert",
            Mutation::UpdatePayload { .. } => "update_payload",
            Mutation::Expire { .. } => "expire",
        }
    }
}

/// Ordered set of mutations intended for atomic application
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct MutationPlan {
    mutations: Vec<Mutation>,
}

impl MutationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mutation> {
        self.mutations.iter()
    }

    pub fn as_slice(&self) -> &[Mutation] {
        &self.mutations
    }
}

impl<'a> IntoIterator for &'a MutationPlan {
    type Item = &'a Mutation;
    type IntoIter = std::slice::Iter<'a, Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.iter()
    }
}

impl IntoIterator for MutationPlan {
    type Item = Mutation;
    type IntoIter = std::vec::IntoIter<Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.into_iter()
    }
}
