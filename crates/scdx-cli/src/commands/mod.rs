pub mod history;
pub mod migrate;
pub mod reconcile;

use scdx_core::RunContext;
use scdx_core_types::TraceId;
use scdx_engine::RunConfig;
use std::path::Path;

/// Fresh run context carrying the invocation's trace id
pub(crate) fn run_context(trace_id: &TraceId) -> RunContext {
    RunContext::new().with_trace_id(trace_id.clone())
}

/// Load `--config` when given, otherwise start from an empty configuration
pub(crate) fn base_config(path: Option<&Path>) -> anyhow::Result<RunConfig> {
    match path {
        Some(path) => Ok(RunConfig::load(path)?),
        None => Ok(RunConfig::default()),
    }
}
