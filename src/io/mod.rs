//! Filesystem loading and report output.
//!
//! Snapshots are loaded from a directory tree of `.rs` files (paths stored
//! relative to the root so backups and commits line up), and every command
//! renders its result through an [`OutputWriter`]: colored terminal text or
//! pretty-printed JSON.

use crate::backup::BackupManifest;
use crate::core::{CompilationUnit, ProgramSnapshot, Severity};
use crate::orchestrator::{ApplyResult, ChainResult, RefactoringPlan};
use crate::workspace::Comparison;
use anyhow::{Context, Result};
use colored::Colorize;
use log::debug;
use std::fs;
use std::io::Write;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Json,
}

/// Parse every `.rs` file under `root` into a snapshot. Hidden directories
/// and `target/` are skipped.
pub fn load_snapshot(root: &Path) -> Result<ProgramSnapshot> {
    let mut units = Vec::new();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != "rs") {
            continue;
        }
        let source = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let relative = path.strip_prefix(root).unwrap_or(path);
        units.push(CompilationUnit::parse(relative, source));
    }
    debug!("loaded {} units from {}", units.len(), root.display());
    Ok(ProgramSnapshot::from_units(units))
}

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    // Depth 0 is the walk root itself; never skip it.
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map_or(false, |name| name == "target" || name.starts_with('.'))
}

/// Write the named units of `snapshot` back to disk under `root`.
pub fn write_units(root: &Path, snapshot: &ProgramSnapshot, paths: &[std::path::PathBuf]) -> Result<usize> {
    let mut written = 0;
    for path in paths {
        let Some(unit) = snapshot.unit(path) else {
            continue;
        };
        let target = root.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, unit.source())
            .with_context(|| format!("writing {}", target.display()))?;
        written += 1;
    }
    Ok(written)
}

pub trait OutputWriter {
    fn write_plan(&mut self, plan: &RefactoringPlan) -> Result<()>;
    fn write_comparison(&mut self, comparison: &Comparison) -> Result<()>;
    fn write_apply(&mut self, result: &ApplyResult) -> Result<()>;
    fn write_chain(&mut self, result: &ChainResult) -> Result<()>;
    fn write_backups(&mut self, backups: &[BackupManifest]) -> Result<()>;
}

pub fn writer_for(format: OutputFormat) -> Box<dyn OutputWriter> {
    match format {
        OutputFormat::Json => Box::new(JsonWriter::new(std::io::stdout())),
        OutputFormat::Terminal => Box::new(TerminalWriter::new(std::io::stdout())),
    }
}

pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn emit<T: serde::Serialize>(&mut self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        self.writer.write_all(json.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> OutputWriter for JsonWriter<W> {
    fn write_plan(&mut self, plan: &RefactoringPlan) -> Result<()> {
        self.emit(plan)
    }

    fn write_comparison(&mut self, comparison: &Comparison) -> Result<()> {
        self.emit(comparison)
    }

    fn write_apply(&mut self, result: &ApplyResult) -> Result<()> {
        self.emit(result)
    }

    fn write_chain(&mut self, result: &ChainResult) -> Result<()> {
        self.emit(result)
    }

    fn write_backups(&mut self, backups: &[BackupManifest]) -> Result<()> {
        self.emit(&backups)
    }
}

pub struct TerminalWriter<W: Write> {
    writer: W,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

fn severity_label(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Critical => "CRITICAL".red().bold(),
        Severity::High => "HIGH".red(),
        Severity::Medium => "MEDIUM".yellow(),
        Severity::Low => "LOW".normal(),
    }
}

fn score_label(score: f64) -> colored::ColoredString {
    let text = format!("{score:+.1}");
    if score > 0.0 {
        text.green()
    } else {
        text.red()
    }
}

impl<W: Write> OutputWriter for TerminalWriter<W> {
    fn write_plan(&mut self, plan: &RefactoringPlan) -> Result<()> {
        writeln!(self.writer, "{}", "Refactoring Plan".bold())?;
        writeln!(
            self.writer,
            "  {} critical, {} high, {} medium, {} low",
            plan.summary.critical, plan.summary.high, plan.summary.medium, plan.summary.low
        )?;
        writeln!(self.writer)?;
        for opportunity in &plan.opportunities {
            let smell = &opportunity.smell;
            writeln!(
                self.writer,
                "[{}] {} {}:{}",
                severity_label(smell.severity),
                smell.smell_type,
                smell.file.display(),
                smell.start_line
            )?;
            writeln!(self.writer, "  {}", smell.description)?;
            for candidate in &opportunity.candidates {
                let verdict = if candidate.estimate.can_apply {
                    format!("improvement {:.1}", candidate.estimate.improvement_score())
                        .green()
                        .to_string()
                } else {
                    candidate
                        .estimate
                        .reason
                        .clone()
                        .unwrap_or_else(|| "not applicable".to_string())
                        .dimmed()
                        .to_string()
                };
                writeln!(self.writer, "    {}: {verdict}", candidate.strategy_name)?;
            }
        }
        Ok(())
    }

    fn write_comparison(&mut self, comparison: &Comparison) -> Result<()> {
        writeln!(
            self.writer,
            "{} {}",
            "Strategy comparison for".bold(),
            comparison.unit_path.display()
        )?;
        for result in &comparison.results {
            writeln!(
                self.writer,
                "  {} score {} (+{} -{} lines)",
                result.strategy_name,
                score_label(result.score.overall_score),
                result.diff.added_lines,
                result.diff.removed_lines
            )?;
        }
        for failed in &comparison.failed_results {
            writeln!(
                self.writer,
                "  {} {}: {}",
                failed.strategy_name,
                "failed".red(),
                failed.error
            )?;
        }
        match comparison.best_result() {
            Some(best) => writeln!(self.writer, "{} {}", "Best:".bold(), best.strategy_name)?,
            None => writeln!(self.writer, "{}", "No viable strategy".yellow())?,
        }
        Ok(())
    }

    fn write_apply(&mut self, result: &ApplyResult) -> Result<()> {
        if result.success {
            writeln!(
                self.writer,
                "{} {} ({} units)",
                "Applied".green().bold(),
                result.strategy_name.as_deref().unwrap_or("strategy"),
                result.modified_units.len()
            )?;
            if let Some(backup) = &result.backup_id {
                writeln!(self.writer, "  backup: {backup}")?;
            }
        } else {
            writeln!(self.writer, "{}", "Nothing applied".yellow())?;
        }
        Ok(())
    }

    fn write_chain(&mut self, result: &ChainResult) -> Result<()> {
        writeln!(
            self.writer,
            "{} {}/{} steps",
            "Chain:".bold(),
            result.steps_completed,
            result.total_steps
        )?;
        for step in &result.step_results {
            let status = if step.applied {
                "applied".green()
            } else {
                "stopped".red()
            };
            match &step.score {
                Some(score) => writeln!(
                    self.writer,
                    "  {} {} score {}",
                    step.refactoring_type,
                    status,
                    score_label(score.overall_score)
                )?,
                None => writeln!(self.writer, "  {} {}", step.refactoring_type, status)?,
            }
        }
        if let Some(reason) = &result.stop_reason {
            writeln!(self.writer, "  {}: {reason}", "stop reason".yellow())?;
        }
        if let Some(score) = result.final_score {
            writeln!(self.writer, "  final score {}", score_label(score))?;
        }
        Ok(())
    }

    fn write_backups(&mut self, backups: &[BackupManifest]) -> Result<()> {
        if backups.is_empty() {
            writeln!(self.writer, "No backups")?;
            return Ok(());
        }
        for manifest in backups {
            writeln!(
                self.writer,
                "{}  {}  {} files  {}",
                manifest.id,
                manifest.created_at.format("%Y-%m-%d %H:%M:%S"),
                manifest.file_count(),
                manifest.description
            )?;
        }
        Ok(())
    }
}
