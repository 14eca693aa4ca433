use scdx_core_types::{RunId, TraceId};
use thiserror::Error;

/// Result type alias using ScdxError
pub type Result<T> = std::result::Result<T, ScdxError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure a reconciliation run can surface maps to exactly one kind,
/// and each kind maps to a stable error code usable for exit codes, alerting
/// and test assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Input/configuration
    InvalidInput,
    /// Required connection or scope information is missing or invalid
    Configuration,
    /// An entry cannot be canonicalised for hashing
    Serialization,

    // Store
    /// The store cannot be opened, configured or reached
    StoreConnection,
    /// A batch write failed or was aborted; nothing was persisted
    StoreTransaction,
    /// A read-side store operation failed (snapshot load, history query)
    Persistence,

    // Run control
    Timeout,
    Cancelled,

    // Integration/IO
    Io,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::StoreConnection => "ERR_STORE_CONNECTION",
            ExErrorKind::StoreTransaction => "ERR_STORE_TRANSACTION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::Cancelled => "ERR_CANCELLED",
            ExErrorKind::Io => "ERR_IO",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification (`kind`) plus the context needed to act on a
/// failed run: which operation, which record, which collection, which run.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    collection: Option<String>,
    run_id: Option<RunId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            collection: None,
            run_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity (record) ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add collection context
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Add run ID context
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the collection context, if any
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Get the run ID context, if any
    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    /// Get the trace ID context, if any
    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Re-classify the error while keeping its context, nesting the original
    /// as the source.
    pub fn reclassify(self, kind: ExErrorKind, op: impl Into<String>) -> Self {
        let message = self.message.clone();
        let mut outer = ExError::new(kind).with_op(op).with_message(message);
        outer.entity_id = self.entity_id.clone();
        outer.collection = self.collection.clone();
        outer.run_id = self.run_id.clone();
        outer.trace_id = self.trace_id.clone();
        outer.with_source(self)
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(collection) = &self.collection {
            write!(f, " (collection: {})", collection)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(run_id) = &self.run_id {
            write!(f, " (run_id: {})", run_id)?;
        }
        if let Some(trace_id) = &self.trace_id {
            write!(f, " (trace_id: {})", trace_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain error taxonomy for SCDX operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScdxError {
    // ===== Input Errors =====
    /// A desired entry is not a JSON object
    #[error("Desired entry at position {position} is not an object (found {found})")]
    EntryNotAnObject { position: usize, found: String },

    /// Canonical serialization failed
    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    // ===== Configuration Errors =====
    /// Scope filter has no collection
    #[error("Scope filter requires a non-empty collection")]
    MissingCollection,

    /// Store connection string is missing
    #[error("Store connection is not configured")]
    MissingStoreConnection,

    /// A payload predicate in the scope filter cannot be evaluated
    #[error("Invalid scope predicate on field '{field}': {reason}")]
    InvalidScopePredicate { field: String, reason: String },

    /// Field keying configured without any field
    #[error("Keying strategy requires at least one field")]
    EmptyKeyingFields,

    /// Generic configuration problem
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    // ===== Batch Errors =====
    /// A mutation targets a record that is no longer active
    #[error("Record {record_id} is not active and cannot be mutated")]
    RecordNotActive { record_id: String },

    /// A mutation targets a record the store does not know
    #[error("Record not found: {record_id}")]
    RecordNotFound { record_id: String },
}

impl From<ScdxError> for ExError {
    fn from(err: ScdxError) -> Self {
        match err {
            ScdxError::EntryNotAnObject { position, found } => {
                ExError::new(ExErrorKind::Serialization)
                    .with_message(format!(
                        "desired entry at position {} is not an object (found {})",
                        position, found
                    ))
            }

            ScdxError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            ScdxError::MissingCollection => ExError::new(ExErrorKind::Configuration)
                .with_message("scope filter requires a non-empty collection"),

            ScdxError::MissingStoreConnection => ExError::new(ExErrorKind::Configuration)
                .with_message("store connection is not configured"),

            ScdxError::InvalidScopePredicate { field, reason } => {
                ExError::new(ExErrorKind::Configuration)
                    .with_message(format!("invalid scope predicate on '{}': {}", field, reason))
            }

            ScdxError::EmptyKeyingFields => ExError::new(ExErrorKind::Configuration)
                .with_message("keying strategy requires at least one field"),

            ScdxError::InvalidConfiguration { reason } => {
                ExError::new(ExErrorKind::Configuration).with_message(reason)
            }

            ScdxError::RecordNotActive { record_id } => {
                ExError::new(ExErrorKind::StoreTransaction)
                    .with_entity_id(record_id)
                    .with_message("record is not active")
            }

            ScdxError::RecordNotFound { record_id } => {
                ExError::new(ExErrorKind::StoreTransaction)
                    .with_entity_id(record_id)
                    .with_message("record not found")
            }
        }
    }
}

/// Conversion from serde_json::Error to ScdxError
impl From<serde_json::Error> for ScdxError {
    fn from(err: serde_json::Error) -> Self {
        ScdxError::Serialization {
            message: err.to_string(),
        }
    }
}
