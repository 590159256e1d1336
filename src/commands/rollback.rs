use anyhow::Result;
use std::path::Path;

use crate::backup::{BackupService, FileBackupService};

pub fn run(path: &Path, backup_id: &str) -> Result<bool> {
    let service = FileBackupService::new(path);
    let restored = service.restore(backup_id)?;
    println!("restored {restored} files from backup {backup_id}");
    Ok(true)
}
