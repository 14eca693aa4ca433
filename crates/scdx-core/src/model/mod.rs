pub mod entry;
pub mod plan;
pub mod record;
pub mod stats;

pub use entry::{ContentHash, DesiredEntry, PartitionKey, RecordId};
pub use plan::{Mutation, MutationPlan};
pub use record::{ActiveRecordRef, NewRecord, VersionedRecord};
pub use stats::Stats;
