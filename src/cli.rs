use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::Severity;
use crate::io::OutputFormat;
use crate::orchestrator::StrategyChain;

#[derive(Parser)]
#[command(
    name = "reforge",
    about = "Automated refactoring with multi-metric quality scoring",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a project and rank refactoring opportunities
    Analyze {
        /// Project root to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: FormatArg,

        /// Drop smells below this severity
        #[arg(long, value_enum)]
        min_severity: Option<SeverityArg>,
    },

    /// Score every applicable strategy for an opportunity without touching disk
    Preview {
        /// Project root to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Only consider opportunities in this unit (relative to the root)
        #[arg(short, long)]
        unit: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: FormatArg,
    },

    /// Apply the best-scoring strategy for the top opportunity and write it back
    Apply {
        /// Project root to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Only consider opportunities in this unit (relative to the root)
        #[arg(short, long)]
        unit: Option<PathBuf>,

        /// Skip the automatic backup of modified units
        #[arg(long)]
        no_backup: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: FormatArg,
    },

    /// Run an ordered strategy chain against a single unit
    Chain {
        /// Project root to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Unit to refactor (relative to the root)
        #[arg(short, long)]
        unit: PathBuf,

        /// Which prebuilt chain to run
        #[arg(short, long, value_enum)]
        goal: ChainGoal,

        /// Skip the automatic backup of the unit
        #[arg(long)]
        no_backup: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: FormatArg,
    },

    /// Restore a previous backup
    Rollback {
        /// Backup id to restore
        backup_id: String,

        /// Project root the backup was taken in
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// List available backups, newest first
    Backups {
        /// Project root to inspect
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: FormatArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Terminal,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Terminal => OutputFormat::Terminal,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeverityArg {
    Low,
    Medium,
    High,
    Critical,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Low => Severity::Low,
            SeverityArg::Medium => Severity::Medium,
            SeverityArg::High => Severity::High,
            SeverityArg::Critical => Severity::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChainGoal {
    GodClass,
    LongMethod,
    Testability,
    Complexity,
}

impl ChainGoal {
    pub fn chain(self) -> StrategyChain {
        match self {
            ChainGoal::GodClass => StrategyChain::for_god_class(),
            ChainGoal::LongMethod => StrategyChain::for_long_method(),
            ChainGoal::Testability => StrategyChain::for_testability(),
            ChainGoal::Complexity => StrategyChain::for_complexity(),
        }
    }
}
