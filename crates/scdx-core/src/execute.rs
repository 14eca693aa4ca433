//! Mutation batch execution
//!
//! Applies a [`MutationPlan`] through a [`VersionStore`] as one atomic batch,
//! previews it in dry-run mode, or skips it when there is nothing to do.
//!
//! ## Outcomes
//!
//! - empty plan: no transaction is opened ([`ExecutionOutcome::EmptyPlanNoop`])
//! - dry run: the store is never contacted ([`ExecutionOutcome::DryRun`])
//! - otherwise: the whole plan lands or nothing does ([`ExecutionOutcome::Applied`])
//!
//! There is no retry. A failed batch is reported as `StoreTransaction`
//! (or `Timeout`/`Cancelled` when the run was interrupted).

use crate::errors::{ExError, ExErrorKind};
use crate::model::MutationPlan;
use crate::run::RunContext;
use crate::store::VersionStore;
use crate::{log_op_end, log_op_error, log_op_start};
use serde::Serialize;
use std::time::Instant;

/// Result of executing a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The batch was committed
    Applied { count: usize },
    /// Dry run: the batch would have contained `count` mutations
    DryRun { count: usize },
    /// Nothing to send
    EmptyPlanNoop,
}

impl ExecutionOutcome {
    /// Mutations actually persisted
    pub fn applied_count(&self) -> usize {
        match self {
            ExecutionOutcome::Applied { count } => *count,
            ExecutionOutcome::DryRun { .. } | ExecutionOutcome::EmptyPlanNoop => 0,
        }
    }

    /// Mutations in the plan, persisted or not
    pub fn mutation_count(&self) -> usize {
        match self {
            ExecutionOutcome::Applied { count } | ExecutionOutcome::DryRun { count } => *count,
            ExecutionOutcome::EmptyPlanNoop => 0,
        }
    }
}

/// Execute a plan against a store.
///
/// # Errors
///
/// - `StoreTransaction`: the batch failed; nothing was persisted
/// - `Timeout` / `Cancelled`: the run was interrupted before or during the write
pub fn execute_plan(
    store: &mut dyn VersionStore,
    collection: &str,
    plan: &MutationPlan,
    dry_run: bool,
    ctx: &RunContext,
) -> Result<ExecutionOutcome, ExError> {
    if plan.is_empty() {
        tracing::info!(collection = %collection, run_id = %ctx.run_id, "There are no ops to send");
        return Ok(ExecutionOutcome::EmptyPlanNoop);
    }

    if dry_run {
        tracing::info!(
            collection = %collection,
            run_id = %ctx.run_id,
            ops_count = plan.len(),
            "Dry run: {} ops would be sent",
            plan.len()
        );
        return Ok(ExecutionOutcome::DryRun { count: plan.len() });
    }

    let started = Instant::now();
    log_op_start!(
        "execute_plan",
        run_id = %ctx.run_id,
        collection = %collection,
        ops_count = plan.len()
    );
    tracing::info!(collection = %collection, "There are {} ops to send", plan.len());

    let result = ctx
        .check("execute_plan")
        .and_then(|_| store.apply_batch(collection, plan, ctx));

    match result {
        Ok(count) => {
            tracing::info!(collection = %collection, "All ops sent {}", count);
            log_op_end!(
                "execute_plan",
                duration_ms = started.elapsed().as_millis() as u64,
                ops_count = count
            );
            Ok(ExecutionOutcome::Applied { count })
        }
        Err(e) => {
            let e = match e.kind() {
                ExErrorKind::StoreTransaction | ExErrorKind::Timeout | ExErrorKind::Cancelled => e,
                _ => e.reclassify(ExErrorKind::StoreTransaction, "execute_plan"),
            };
            let e = ctx.annotate(e.with_collection(collection));
            log_op_error!(
                "execute_plan",
                e.clone(),
                duration_ms = started.elapsed().as_millis() as u64
            );
            Err(e)
        }
    }
}
