use anyhow::Result;
use std::path::Path;

use crate::backup::{BackupService, FileBackupService};
use crate::io::{self, OutputFormat};

pub fn run(path: &Path, format: OutputFormat) -> Result<bool> {
    let service = FileBackupService::new(path);
    let backups = service.list_backups()?;
    io::writer_for(format).write_backups(&backups)?;
    Ok(true)
}
