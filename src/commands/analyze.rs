use anyhow::Result;
use std::path::Path;

use crate::config::ReforgeConfig;
use crate::core::Severity;
use crate::io::{self, OutputFormat};
use crate::orchestrator::Orchestrator;

pub fn run(path: &Path, format: OutputFormat, min_severity: Option<Severity>) -> Result<bool> {
    let config = ReforgeConfig::load(path)?;
    let min_severity = min_severity.unwrap_or(config.min_severity);
    let snapshot = io::load_snapshot(path)?;
    let orchestrator = Orchestrator::new(config);
    let plan = orchestrator.analyze(&snapshot, min_severity);
    io::writer_for(format).write_plan(&plan)?;
    Ok(true)
}
