//! End-to-end runs over a real directory tree: load, analyze, compare,
//! apply with backup, and roll back.

use indoc::indoc;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

use reforge::backup::{BackupService, FileBackupService};
use reforge::commands;
use reforge::config::ReforgeConfig;
use reforge::core::Severity;
use reforge::io::{self, OutputFormat};
use reforge::orchestrator::{Orchestrator, StrategyChain};

const SETTLE: &str = indoc! {"
    pub fn settle(ready: bool, amounts: &[u32]) {
        if ready {
            let mut total: u32 = 0;
            let mut count: u32 = 0;
            for amount in amounts {
                if *amount > 0 {
                    total += *amount;
                    count += 1;
                }
            }
            checkpoint();
            report(total, count);
        }
    }

    fn checkpoint() {}

    fn report(_total: u32, _count: u32) {}
"};

fn scaffold() -> TempDir {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/settle.rs"), SETTLE).unwrap();
    fs::write(
        dir.path().join("reforge.toml"),
        "[thresholds]\nlong_method_lines = 10\ndeep_nesting = 3\n",
    )
    .unwrap();
    dir
}

#[test]
fn analyze_finds_opportunities_in_a_real_tree() {
    let dir = scaffold();
    let config = ReforgeConfig::load(dir.path()).unwrap();
    assert_eq!(config.thresholds.long_method_lines, 10);

    let snapshot = io::load_snapshot(dir.path()).unwrap();
    let orchestrator = Orchestrator::new(config);
    let plan = orchestrator.analyze(&snapshot, Severity::Low);

    assert!(!plan.opportunities.is_empty());
    assert!(plan
        .opportunities
        .iter()
        .all(|o| o.smell.file == PathBuf::from("src/settle.rs")));
    assert_eq!(plan.summary.total(), plan.opportunities.len());
}

#[test]
fn apply_writes_back_and_backup_restores() {
    let dir = scaffold();
    let config = ReforgeConfig::load(dir.path()).unwrap();
    let mut snapshot = io::load_snapshot(dir.path()).unwrap();
    let orchestrator = Orchestrator::new(config);

    let plan = orchestrator.analyze(&snapshot, Severity::Low);
    let opportunity = &plan.opportunities[0];
    let comparison = orchestrator.compare_strategies(&snapshot, opportunity);

    let service = FileBackupService::new(dir.path());
    let result = orchestrator
        .apply_best_strategy(&mut snapshot, &comparison, Some(&service))
        .unwrap();
    if !result.success {
        // No viable branch for this opportunity; the tree must be untouched.
        assert_eq!(
            fs::read_to_string(dir.path().join("src/settle.rs")).unwrap(),
            SETTLE
        );
        return;
    }

    let written = io::write_units(dir.path(), &snapshot, &result.modified_units).unwrap();
    assert_eq!(written, result.modified_units.len());
    let on_disk = fs::read_to_string(dir.path().join("src/settle.rs")).unwrap();
    assert_ne!(on_disk, SETTLE);

    let backup_id = result.backup_id.expect("apply with a service takes a backup");
    let restored = service.restore(&backup_id).unwrap();
    assert_eq!(restored, result.modified_units.len());
    assert_eq!(
        fs::read_to_string(dir.path().join("src/settle.rs")).unwrap(),
        SETTLE
    );
}

#[test]
fn chain_handler_runs_against_the_tree() {
    let dir = scaffold();
    let applied = commands::chain::run(
        dir.path(),
        Path::new("src/settle.rs"),
        StrategyChain::for_long_method(),
        true,
        OutputFormat::Json,
    )
    .unwrap();

    let on_disk = fs::read_to_string(dir.path().join("src/settle.rs")).unwrap();
    if applied {
        assert_ne!(on_disk, SETTLE);
    } else {
        assert_eq!(on_disk, SETTLE);
    }
}

#[test]
fn rollback_handler_reports_unknown_ids() {
    let dir = scaffold();
    assert!(commands::rollback::run(dir.path(), "no-such-backup").is_err());
}
