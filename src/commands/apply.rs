use anyhow::Result;
use std::path::Path;

use crate::backup::{BackupService, FileBackupService};
use crate::config::ReforgeConfig;
use crate::io::{self, OutputFormat};
use crate::orchestrator::Orchestrator;

pub fn run(path: &Path, unit: Option<&Path>, no_backup: bool, format: OutputFormat) -> Result<bool> {
    let config = ReforgeConfig::load(path)?;
    let min_severity = config.min_severity;
    let mut snapshot = io::load_snapshot(path)?;
    let orchestrator = Orchestrator::new(config);
    let plan = orchestrator.analyze(&snapshot, min_severity);

    let Some(opportunity) = super::select_opportunity(&plan, unit) else {
        eprintln!("no refactoring opportunity found");
        return Ok(false);
    };

    let comparison = orchestrator.compare_strategies(&snapshot, opportunity);
    let backup_service = FileBackupService::new(path);
    let backup: Option<&dyn BackupService> = if no_backup {
        None
    } else {
        Some(&backup_service)
    };
    let result = orchestrator.apply_best_strategy(&mut snapshot, &comparison, backup)?;

    if result.success {
        io::write_units(path, &snapshot, &result.modified_units)?;
    }
    io::writer_for(format).write_apply(&result)?;
    Ok(result.success)
}
