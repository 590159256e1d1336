pub mod snapshot;
pub mod source;

pub use snapshot::{CompilationUnit, Diagnostic, DiagnosticSeverity, ProgramSnapshot};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Severity of a detected code smell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Represents different types of code smells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmellType {
    LongMethod,
    GodClass,
    DeepNesting,
    FeatureEnvy,
    SwitchOnType,
    LongParameterList,
}

impl fmt::Display for SmellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SmellType::LongMethod => "long-method",
            SmellType::GodClass => "god-class",
            SmellType::DeepNesting => "deep-nesting",
            SmellType::FeatureEnvy => "feature-envy",
            SmellType::SwitchOnType => "switch-on-type",
            SmellType::LongParameterList => "long-parameter-list",
        };
        write!(f, "{name}")
    }
}

/// A detected code smell with its location and details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSmell {
    pub smell_type: SmellType,
    pub severity: Severity,
    pub file: PathBuf,
    pub start_line: usize,
    pub end_line: usize,
    pub target_name: String,
    pub description: String,
}

/// Closed set of transformation kinds the engine knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefactoringType {
    SimplifyMethod,
    ExtractMethod,
    ExtractClass,
    ExtractInterface,
    SplitGodClass,
    ReplaceConditional,
}

impl RefactoringType {
    pub const ALL: [RefactoringType; 6] = [
        RefactoringType::SimplifyMethod,
        RefactoringType::ExtractMethod,
        RefactoringType::ExtractClass,
        RefactoringType::ExtractInterface,
        RefactoringType::SplitGodClass,
        RefactoringType::ReplaceConditional,
    ];
}

impl fmt::Display for RefactoringType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RefactoringType::SimplifyMethod => "simplify-method",
            RefactoringType::ExtractMethod => "extract-method",
            RefactoringType::ExtractClass => "extract-class",
            RefactoringType::ExtractInterface => "extract-interface",
            RefactoringType::SplitGodClass => "split-god-class",
            RefactoringType::ReplaceConditional => "replace-conditional",
        };
        write!(f, "{name}")
    }
}

/// Cooperative cancellation flag checked at unit granularity by long scans.
///
/// A cancelled scan returns partial results for units already analyzed
/// instead of discarding them.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_from_low_to_critical() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn cancellation_token_is_shared_across_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
