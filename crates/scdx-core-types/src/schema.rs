//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names identical across the reconciler, the
//! store and the CLI so log pipelines can key on them.

// Canonical field keys for structured logging
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";
pub const FIELD_TRACE_ID: &str = "trace_id";
pub const FIELD_COLLECTION: &str = "collection";

// Collection sizes
pub const FIELD_ACTIVE_COUNT: &str = "active_count";
pub const FIELD_DESIRED_COUNT: &str = "desired_count";
pub const FIELD_OPS_COUNT: &str = "ops_count";

// Stats
pub const FIELD_INSERTS: &str = "inserts";
pub const FIELD_UPDATES: &str = "updates";
pub const FIELD_DELETES: &str = "deletes";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
