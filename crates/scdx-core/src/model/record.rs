use crate::model::entry::{ContentHash, DesiredEntry, PartitionKey, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The store's persisted unit of Type-2 history
///
/// A record is created by an insert, may have its payload replaced while
/// active, and becomes immutable once `end_ts` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedRecord {
    pub id: RecordId,
    pub collection: String,
    pub hash: ContentHash,
    pub key: PartitionKey,
    pub payload: DesiredEntry,
    pub start_ts: DateTime<Utc>,
    /// `None` while the record is active
    pub end_ts: Option<DateTime<Utc>>,
    /// Last in-place payload update, if any
    pub updated_ts: Option<DateTime<Utc>>,
}

impl VersionedRecord {
    /// Check if the record is currently active
    pub fn is_active(&self) -> bool {
        self.end_ts.is_none()
    }

    /// Check if the record was valid at the given instant
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.start_ts <= at && self.end_ts.map_or(true, |end| end > at)
    }
}

/// Projection of an active record used to build the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRecordRef {
    pub id: RecordId,
    pub hash: ContentHash,
    pub key: PartitionKey,
}

/// Document of an insert; the store assigns the id and leaves `end_ts` null
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub hash: ContentHash,
    pub key: PartitionKey,
    pub payload: DesiredEntry,
    pub start_ts: DateTime<Utc>,
}
