//! SCDX Engine - Orchestration layer
//!
//! Provides run configuration, desired snapshot input, and the commands that
//! coordinate core reconciliation with the SQLite store.

pub mod commands;
pub mod config;
pub mod input;

pub use commands::engine_command::{apply_engine_command, EngineCommand, EngineCommandResult};
pub use commands::reconcile::{reconcile_run, reconcile_with_config, ReconcileOptions, RunReport};
pub use config::{RunConfig, RunOverrides};
