//! Run-scoped context
//!
//! Everything that must be identical across the phases of one
//! reconciliation run lives here and nowhere else: the run id, the single
//! `now` boundary, the cancellation token and the deadline. A fresh context
//! is built for every run so no snapshot state leaks between runs.

use crate::errors::{ExError, ExErrorKind};
use chrono::{DateTime, SubsecRound, Utc};
use scdx_core_types::{RunId, TraceId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation flag
///
/// Cloned into whatever needs to observe it (the engine between phases, the
/// SQLite progress handler during I/O). Cancelling is irreversible.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raw flag for handlers that need `'static` ownership
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// Context of one reconciliation run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: RunId,
    pub trace_id: Option<TraceId>,
    /// The run's single point-in-time boundary, millisecond precision
    pub now: DateTime<Utc>,
    pub cancel: CancelToken,
    pub deadline: Option<Instant>,
}

impl RunContext {
    /// Capture `now` and start a new run
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Start a run with an explicit boundary timestamp
    ///
    /// Truncated to milliseconds, the precision the store persists.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            run_id: RunId::new(),
            trace_id: None,
            now: now.trunc_subsecs(3),
            cancel: CancelToken::new(),
            deadline: None,
        }
    }

    /// Bound the run's I/O by a timeout counted from now
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_past_deadline(&self) -> bool {
        self.deadline.map_or(false, |d| Instant::now() >= d)
    }

    /// Fail fast if the run was cancelled or ran out of time.
    ///
    /// # Errors
    ///
    /// `Cancelled` when the token was triggered, `Timeout` when the deadline
    /// has passed.
    pub fn check(&self, op: &str) -> Result<(), ExError> {
        if self.is_cancelled() {
            return Err(self.interrupted(ExErrorKind::Cancelled, op));
        }
        if self.is_past_deadline() {
            return Err(self.interrupted(ExErrorKind::Timeout, op));
        }
        Ok(())
    }

    /// Build the error for an interrupted operation
    pub fn interrupted(&self, kind: ExErrorKind, op: &str) -> ExError {
        let message = match kind {
            ExErrorKind::Cancelled => "run cancelled",
            ExErrorKind::Timeout => "run deadline exceeded",
            _ => "run interrupted",
        };
        self.annotate(ExError::new(kind).with_op(op).with_message(message))
    }

    /// Attach run correlation to an error
    pub fn annotate(&self, err: ExError) -> ExError {
        let err = err.with_run_id(self.run_id.clone());
        match &self.trace_id {
            Some(trace_id) => err.with_trace_id(trace_id.clone()),
            None => err,
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
