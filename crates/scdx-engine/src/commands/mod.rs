//! Command orchestration layer.
//!
//! Provides high-level command functions that coordinate between
//! core reconciliation logic and the SQLite store.

pub mod engine_command;
pub mod history;
pub mod reconcile;
