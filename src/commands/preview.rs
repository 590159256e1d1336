use anyhow::Result;
use log::warn;
use std::path::Path;

use crate::config::ReforgeConfig;
use crate::io::{self, OutputFormat};
use crate::orchestrator::Orchestrator;

pub fn run(path: &Path, unit: Option<&Path>, format: OutputFormat) -> Result<bool> {
    let config = ReforgeConfig::load(path)?;
    let min_severity = config.min_severity;
    let snapshot = io::load_snapshot(path)?;
    let orchestrator = Orchestrator::new(config);
    let plan = orchestrator.analyze(&snapshot, min_severity);

    let Some(opportunity) = super::select_opportunity(&plan, unit) else {
        warn!("no refactoring opportunity found");
        eprintln!("no refactoring opportunity found");
        return Ok(false);
    };

    let comparison = orchestrator.compare_strategies(&snapshot, opportunity);
    io::writer_for(format).write_comparison(&comparison)?;
    Ok(true)
}
