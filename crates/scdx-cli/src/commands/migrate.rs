//! Migrate command

use clap::Args;
use scdx_core_types::TraceId;
use scdx_engine::{apply_engine_command, EngineCommand, EngineCommandResult, RunOverrides};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct MigrateArgs {
    #[arg(long)]
    pub db: Option<PathBuf>,

    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn execute(args: MigrateArgs, trace_id: &TraceId) -> anyhow::Result<()> {
    let mut config = super::base_config(args.config.as_deref())?;
    config.apply_overrides(RunOverrides {
        db: args.db,
        ..RunOverrides::default()
    });

    match apply_engine_command(EngineCommand::Migrate, &config, &super::run_context(trace_id))? {
        EngineCommandResult::Migrate { applied } => {
            println!("✓ Store schema is up to date");
            for id in applied {
                println!("  {}", id);
            }
            Ok(())
        }
        other => anyhow::bail!("unexpected engine result: {:?}", other),
    }
}
