//! Reconciliation run orchestration.
//!
//! ## Pipeline (in order):
//! 1. Scope validation (hard stop, no store access)
//! 2. Active record load into the run's index
//! 3. Reconciliation into an ordered plan plus stats
//! 4. Cancellation/deadline check
//! 5. Batch execution (or dry-run / empty-plan short-circuit)
//!
//! A run fully succeeds or fully fails; the index never outlives the run.

#![allow(clippy::result_large_err)]

use crate::config::RunConfig;
use scdx_core::errors::ExError;
use scdx_core::{
    execute_plan, load_active_index, log_op_end, log_op_error, log_op_start, reconcile,
    DesiredEntry, ExecutionOutcome, MemoryVersionStore, ReconcileConfig, RunContext,
    ScopeFilter, Stats, VersionStore,
};
use scdx_core_types::RunId;
use scdx_store::SqliteVersionStore;
use serde::Serialize;
use std::time::Instant;

/// Options of a single run
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Compute and report the plan without writing it
    pub dry_run: bool,
}

/// What a run did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub collection: String,
    /// Active records in scope when the run started
    pub active_before: usize,
    pub stats: Stats,
    pub outcome: ExecutionOutcome,
}

/// Reconcile `desired` against the active records selected by `scope`.
///
/// ## Errors
///
/// - `Configuration`: invalid scope filter
/// - `Serialization`: an entry cannot be hashed
/// - `Persistence`: the active record load failed
/// - `StoreTransaction`: the batch failed; nothing was persisted
/// - `Timeout` / `Cancelled`: the run was interrupted
pub fn reconcile_run(
    store: &mut dyn VersionStore,
    desired: &[DesiredEntry],
    scope: &ScopeFilter,
    config: &ReconcileConfig,
    options: &ReconcileOptions,
    ctx: &RunContext,
) -> Result<RunReport, ExError> {
    let started = Instant::now();
    log_op_start!(
        "reconcile_run",
        run_id = %ctx.run_id,
        trace_id = ctx.trace_id.as_ref().map(|t| t.as_str()),
        collection = %scope.collection,
        desired_count = desired.len(),
        dry_run = options.dry_run
    );

    let result = run_pipeline(store, desired, scope, config, options, ctx);

    match &result {
        Ok(report) => {
            tracing::info!(
                run_id = %ctx.run_id,
                collection = %scope.collection,
                "Run finished: {}",
                report.stats
            );
            log_op_end!(
                "reconcile_run",
                duration_ms = started.elapsed().as_millis() as u64,
                run_id = %ctx.run_id,
                inserts = report.stats.insert,
                updates = report.stats.update,
                deletes = report.stats.delete
            );
        }
        Err(e) => {
            log_op_error!(
                "reconcile_run",
                e.clone(),
                duration_ms = started.elapsed().as_millis() as u64
            );
        }
    }
    result
}

fn run_pipeline(
    store: &mut dyn VersionStore,
    desired: &[DesiredEntry],
    scope: &ScopeFilter,
    config: &ReconcileConfig,
    options: &ReconcileOptions,
    ctx: &RunContext,
) -> Result<RunReport, ExError> {
    scope
        .validate()
        .map_err(|e| ctx.annotate(ExError::from(e).with_op("reconcile_run")))?;

    let mut index = load_active_index(store, scope, ctx)?;
    let active_before = index.len();

    let reconciliation = reconcile(desired, &mut index, config, ctx.now).map_err(|e| {
        ctx.annotate(
            ExError::from(e)
                .with_op("reconcile")
                .with_collection(scope.collection.clone()),
        )
    })?;
    tracing::debug!(
        collection = %scope.collection,
        ops_count = reconciliation.plan.len(),
        "Reconciled {} desired entries",
        desired.len()
    );

    ctx.check("reconcile_run")?;

    let outcome = execute_plan(
        store,
        &scope.collection,
        &reconciliation.plan,
        options.dry_run,
        ctx,
    )?;

    Ok(RunReport {
        run_id: ctx.run_id.clone(),
        collection: scope.collection.clone(),
        active_before,
        stats: reconciliation.stats,
        outcome,
    })
}

/// Run a reconciliation described by a validated configuration.
///
/// A committing run opens the configured SQLite store, applying migrations
/// first. A dry run opens it read-only and never creates it; a store that
/// does not exist yet reads as empty.
///
/// ## Errors
///
/// As [`reconcile_run`], plus `Configuration` for an incomplete config and
/// `StoreConnection` when the store cannot be opened.
pub fn reconcile_with_config(
    config: &RunConfig,
    desired: &[DesiredEntry],
    ctx: &RunContext,
) -> Result<RunReport, ExError> {
    config.validate().map_err(|e| ctx.annotate(e))?;
    let reconcile_config = config.reconcile_config().map_err(|e| ctx.annotate(e))?;
    let scope = config.scope();
    let options = ReconcileOptions {
        dry_run: config.run.dry_run,
    };

    if !options.dry_run {
        let mut store = open_store(config).map_err(|e| ctx.annotate(e))?;
        return reconcile_run(&mut store, desired, &scope, &reconcile_config, &options, ctx);
    }

    match open_store_read_only(config).map_err(|e| ctx.annotate(e))? {
        Some(mut store) => {
            reconcile_run(&mut store, desired, &scope, &reconcile_config, &options, ctx)
        }
        None => {
            tracing::info!(
                run_id = %ctx.run_id,
                collection = %scope.collection,
                "Store is not provisioned; dry run starts from an empty active set"
            );
            let mut empty = MemoryVersionStore::new();
            reconcile_run(&mut empty, desired, &scope, &reconcile_config, &options, ctx)
        }
    }
}

fn configured_path(config: &RunConfig) -> Result<&str, ExError> {
    config.store_path().ok_or_else(|| {
        ExError::from(scdx_core::ScdxError::MissingStoreConnection).with_op("open_store")
    })
}

/// Open the store named by the configuration
///
/// ## Errors
///
/// `Configuration` when no store is configured, `StoreConnection` when it
/// cannot be opened.
pub fn open_store(config: &RunConfig) -> Result<SqliteVersionStore, ExError> {
    SqliteVersionStore::open(configured_path(config)?, config.store_options())
}

/// Open the configured store without creating or migrating it
///
/// ## Errors
///
/// As [`open_store`].
pub fn open_store_read_only(config: &RunConfig) -> Result<Option<SqliteVersionStore>, ExError> {
    SqliteVersionStore::open_read_only(configured_path(config)?, config.store_options())
}
