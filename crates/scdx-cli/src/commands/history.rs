//! History command

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use scdx_core_types::TraceId;
use scdx_engine::{apply_engine_command, EngineCommand, EngineCommandResult, RunOverrides};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[arg(long)]
    pub collection: String,

    /// Only versions with this partition key
    #[arg(long, conflicts_with = "as_of")]
    pub key: Option<String>,

    /// Only records valid at this instant (RFC 3339)
    #[arg(long)]
    pub as_of: Option<DateTime<Utc>>,

    #[arg(long)]
    pub db: Option<PathBuf>,

    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn execute(args: HistoryArgs, trace_id: &TraceId) -> anyhow::Result<()> {
    let mut config = super::base_config(args.config.as_deref())?;
    config.apply_overrides(RunOverrides {
        db: args.db,
        ..RunOverrides::default()
    });

    let cmd = match args.as_of {
        Some(at) => EngineCommand::AsOf {
            collection: args.collection,
            at,
        },
        None => EngineCommand::History {
            collection: args.collection,
            key: args.key,
        },
    };

    let records = match apply_engine_command(cmd, &config, &super::run_context(trace_id))? {
        EngineCommandResult::Records(records) => records,
        other => anyhow::bail!("unexpected engine result: {:?}", other),
    };

    // One JSON document per line
    for record in &records {
        println!(
            "{}",
            serde_json::to_string(record).context("serializing record")?
        );
    }
    Ok(())
}
