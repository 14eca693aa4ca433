//! Reconcile command

use anyhow::Context;
use clap::Args;
use scdx_core::ExecutionOutcome;
use scdx_core_types::TraceId;
use scdx_engine::input::load_desired;
use scdx_engine::{apply_engine_command, EngineCommand, EngineCommandResult, RunOverrides};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Desired snapshot: a JSON array of objects or NDJSON
    #[arg(long)]
    pub input: PathBuf,

    /// Run configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// SQLite store path (overrides [store].path)
    #[arg(long)]
    pub db: Option<PathBuf>,

    #[arg(long)]
    pub collection: Option<String>,

    /// Hash only these fields
    #[arg(long, value_delimiter = ',', conflicts_with = "omit")]
    pub pick: Option<Vec<String>>,

    /// Hash everything except these fields
    #[arg(long, value_delimiter = ',')]
    pub omit: Option<Vec<String>>,

    /// Derive the partition key from these fields
    #[arg(long = "key-field", value_delimiter = ',')]
    pub key_fields: Option<Vec<String>>,

    #[arg(long)]
    pub dry_run: bool,

    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: ReconcileArgs, trace_id: &TraceId) -> anyhow::Result<()> {
    let mut config = super::base_config(args.config.as_deref())?;
    config.apply_overrides(RunOverrides {
        db: args.db,
        collection: args.collection,
        pick: args.pick,
        omit: args.omit,
        key_fields: args.key_fields,
        dry_run: args.dry_run,
        timeout_ms: args.timeout_ms,
    });

    let desired = load_desired(&args.input)?;

    let mut ctx = super::run_context(trace_id);
    if let Some(timeout) = config.timeout() {
        ctx = ctx.with_timeout(timeout);
    }
    tracing::info!(
        run_id = %ctx.run_id,
        trace_id = %trace_id,
        collection = %config.scope.collection,
        desired_count = desired.len(),
        "Starting reconciliation"
    );

    let report = match apply_engine_command(EngineCommand::Reconcile { desired }, &config, &ctx)? {
        EngineCommandResult::Reconcile(report) => report,
        other => anyhow::bail!("unexpected engine result: {:?}", other),
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing run report")?
        );
        return Ok(());
    }

    let outcome = match report.outcome {
        ExecutionOutcome::Applied { count } => format!("applied {} ops", count),
        ExecutionOutcome::DryRun { count } => format!("dry run, {} ops not sent", count),
        ExecutionOutcome::EmptyPlanNoop => "no ops to send".to_string(),
    };
    println!("✓ Reconciled collection {}", report.collection);
    println!("  run_id: {}", report.run_id);
    println!("  {}", report.stats);
    println!("  {}", outcome);
    Ok(())
}
