//! SCDX Core - Type-2 history reconciliation kernel
//!
//! This crate provides the pure part of SCDX:
//! - Content hashing and partition keying of desired entries
//! - The active record index built once per run
//! - The reconciler producing an ordered mutation plan plus stats
//! - The batch executor and the store contract it drives
//! - Error and logging facilities shared by every SCDX crate
//!
//! Persistence lives in `scdx-store`; orchestration in `scdx-engine`.

pub mod errors;
pub mod execute;
pub mod hashing;
pub mod index;
pub mod keying;
pub mod logging_facility;
pub mod model;
pub mod reconcile;
pub mod run;
pub mod store;

#[doc(hidden)]
pub use scdx_core_types;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, Result, ScdxError};
pub use execute::{execute_plan, ExecutionOutcome};
pub use hashing::{compute_hash, HashingConfig};
pub use index::{load_active_index, ActiveRecordIndex};
pub use keying::{compute_key, DefaultKeying, FieldKeying, FnKeying, KeyingStrategy};
pub use model::{
    ActiveRecordRef, ContentHash, DesiredEntry, Mutation, MutationPlan, NewRecord, PartitionKey,
    RecordId, Stats, VersionedRecord,
};
pub use reconcile::{reconcile, ReconcileConfig, Reconciliation};
pub use run::{CancelToken, RunContext};
pub use store::{MemoryVersionStore, ScopeFilter, VersionStore};
