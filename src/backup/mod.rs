//! File backup and rollback.
//!
//! The orchestrator requests a backup before any result is committed to
//! disk. Backups live under `.reforge/backups/<uuid>/` in the workspace
//! root: a `files/` tree mirroring the backed-up paths plus a
//! `manifest.json` describing the set.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

const BACKUP_DIR: &str = ".reforge/backups";
const MANIFEST_FILE: &str = "manifest.json";
const FILES_DIR: &str = "files";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub files: Vec<PathBuf>,
}

impl BackupManifest {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

pub trait BackupService {
    /// Snapshot the given files; returns the backup id.
    fn create_backup(&self, unit_paths: &[PathBuf], description: &str) -> Result<String>;

    /// Put a backup's files back in place; returns how many were restored.
    fn restore(&self, backup_id: &str) -> Result<usize>;

    /// All known backups, newest first.
    fn list_backups(&self) -> Result<Vec<BackupManifest>>;
}

/// Backup service over a workspace directory on disk.
pub struct FileBackupService {
    root: PathBuf,
}

impl FileBackupService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn backups_root(&self) -> PathBuf {
        self.root.join(BACKUP_DIR)
    }

    fn manifest_of(&self, backup_id: &str) -> Result<BackupManifest> {
        let path = self.backups_root().join(backup_id).join(MANIFEST_FILE);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("no backup manifest at {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("corrupt backup manifest {}", path.display()))
    }
}

impl BackupService for FileBackupService {
    fn create_backup(&self, unit_paths: &[PathBuf], description: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let backup_dir = self.backups_root().join(&id);
        let files_dir = backup_dir.join(FILES_DIR);
        fs::create_dir_all(&files_dir)
            .with_context(|| format!("creating backup directory {}", backup_dir.display()))?;

        let mut files = Vec::new();
        for path in unit_paths {
            let source = self.root.join(path);
            let target = files_dir.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&source, &target)
                .with_context(|| format!("backing up {}", source.display()))?;
            files.push(path.clone());
        }

        let manifest = BackupManifest {
            id: id.clone(),
            created_at: Utc::now(),
            description: description.to_string(),
            files,
        };
        fs::write(
            backup_dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest)?,
        )?;
        info!("created backup {id} ({} files)", manifest.file_count());
        Ok(id)
    }

    fn restore(&self, backup_id: &str) -> Result<usize> {
        let manifest = self.manifest_of(backup_id)?;
        let files_dir = self.backups_root().join(backup_id).join(FILES_DIR);
        let mut restored = 0;
        for path in &manifest.files {
            let source = files_dir.join(path);
            let target = self.root.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&source, &target)
                .with_context(|| format!("restoring {}", target.display()))?;
            restored += 1;
        }
        info!("restored backup {backup_id} ({restored} files)");
        Ok(restored)
    }

    fn list_backups(&self) -> Result<Vec<BackupManifest>> {
        let root = self.backups_root();
        if !root.exists() {
            return Ok(Vec::new());
        }
        let mut manifests = Vec::new();
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            // Skip directories without a readable manifest.
            if let Ok(manifest) = self.manifest_of(&id) {
                manifests.push(manifest);
            }
        }
        manifests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(manifests)
    }
}
