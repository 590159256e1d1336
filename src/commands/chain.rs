use anyhow::Result;
use std::path::Path;

use crate::backup::{BackupService, FileBackupService};
use crate::config::ReforgeConfig;
use crate::io::{self, OutputFormat};
use crate::orchestrator::{Orchestrator, StrategyChain};

pub fn run(
    path: &Path,
    unit: &Path,
    chain: StrategyChain,
    no_backup: bool,
    format: OutputFormat,
) -> Result<bool> {
    let config = ReforgeConfig::load(path)?;
    let mut snapshot = io::load_snapshot(path)?;
    let orchestrator = Orchestrator::new(config);

    let result = orchestrator.apply_strategy_chain(&mut snapshot, unit, &chain);
    let applied = result.steps_completed > 0;

    if applied {
        // Back up the on-disk unit before overwriting it.
        if !no_backup {
            FileBackupService::new(path)
                .create_backup(&[unit.to_path_buf()], &format!("before {}", chain.description))?;
        }
        io::write_units(path, &snapshot, &[unit.to_path_buf()])?;
    }
    io::writer_for(format).write_chain(&result)?;
    Ok(applied)
}
