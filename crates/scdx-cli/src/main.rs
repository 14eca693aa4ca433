//! SCDX CLI
//!
//! Command-line interface for Type-2 history reconciliation

use clap::{Parser, Subcommand};
use scdx_core::logging_facility::{init, Profile};
use scdx_core_types::TraceId;

mod commands;
mod exit;

#[derive(Debug, Parser)]
#[command(name = "scdx")]
#[command(about = "SCDX - Type-2 history reconciliation for JSON snapshots", long_about = None)]
struct Cli {
    /// Log profile: development (human readable) or production (JSON)
    #[arg(long, global = true, default_value = "development", value_parser = parse_profile)]
    log: Profile,

    /// Correlation id attached to every run and error of this invocation
    /// (a fresh UUIDv7 when omitted)
    #[arg(long, global = true)]
    trace_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Reconcile a desired snapshot into the store
    Reconcile(commands::reconcile::ReconcileArgs),
    /// Print the stored versions of a collection
    History(commands::history::HistoryArgs),
    /// Provision the store schema
    Migrate(commands::migrate::MigrateArgs),
}

fn parse_profile(name: &str) -> Result<Profile, String> {
    Profile::from_name(name).ok_or_else(|| format!("unknown log profile '{}'", name))
}

fn main() {
    let cli = Cli::parse();
    init(cli.log);
    let trace_id = cli.trace_id.map(TraceId::from_string).unwrap_or_default();

    let result = match cli.command {
        Commands::Reconcile(args) => commands::reconcile::execute(args, &trace_id),
        Commands::History(args) => commands::history::execute(args, &trace_id),
        Commands::Migrate(args) => commands::migrate::execute(args, &trace_id),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit::exit_code(&e));
    }
}
