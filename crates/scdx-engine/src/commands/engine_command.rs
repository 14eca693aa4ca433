//! Engine-level commands requiring store I/O.

#![allow(clippy::result_large_err)]

use crate::commands::history::{as_of, history, migrate};
use crate::commands::reconcile::{reconcile_with_config, RunReport};
use crate::config::RunConfig;
use chrono::{DateTime, Utc};
use scdx_core::errors::ExError;
use scdx_core::{DesiredEntry, RunContext, VersionedRecord};

/// Commands the engine can execute against a configured store
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Reconcile a desired snapshot into the configured scope
    Reconcile { desired: Vec<DesiredEntry> },
    /// List every version of a collection
    History {
        collection: String,
        key: Option<String>,
    },
    /// Records of a collection valid at an instant
    AsOf {
        collection: String,
        at: DateTime<Utc>,
    },
    /// Provision the schema only
    Migrate,
}

/// Result of applying an engine command
#[derive(Debug, Clone)]
pub enum EngineCommandResult {
    Reconcile(RunReport),
    Records(Vec<VersionedRecord>),
    Migrate { applied: Vec<String> },
}

/// Apply an engine command under a run context
///
/// # Errors
///
/// Whatever the underlying command reports; see [`reconcile_with_config`]
/// and the history commands.
pub fn apply_engine_command(
    cmd: EngineCommand,
    config: &RunConfig,
    ctx: &RunContext,
) -> Result<EngineCommandResult, ExError> {
    match cmd {
        EngineCommand::Reconcile { desired } => {
            reconcile_with_config(config, &desired, ctx).map(EngineCommandResult::Reconcile)
        }
        EngineCommand::History { collection, key } => history(config, &collection, key.as_deref())
            .map(EngineCommandResult::Records)
            .map_err(|e| ctx.annotate(e)),
        EngineCommand::AsOf { collection, at } => as_of(config, &collection, at)
            .map(EngineCommandResult::Records)
            .map_err(|e| ctx.annotate(e)),
        EngineCommand::Migrate => migrate(config)
            .map(|applied| EngineCommandResult::Migrate { applied })
            .map_err(|e| ctx.annotate(e)),
    }
}
