//! Immutable program snapshots and compilation units.
//!
//! A snapshot is the unit of isolation for trial transformations: the virtual
//! workspace forks a snapshot per candidate strategy, and every edit produces
//! a new snapshot value. Unchanged units are shared structurally through
//! `im::HashMap`, so forking is cheap even for large programs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// One parser or analysis diagnostic attached to a compilation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub line: usize,
}

/// A single source file with its parse diagnostics.
///
/// Immutable once constructed. A unit that fails to parse carries an
/// error diagnostic; downstream scoring treats such units as
/// compilation-invalid rather than erroring out. Syntax trees are not
/// stored: `syn` ASTs hold non-`Send` token data, so units keep only the
/// source text (making snapshots shareable across rayon workers) and
/// [`ast`](Self::ast) re-parses on demand inside the calling thread.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    path: PathBuf,
    source: Arc<str>,
    diagnostics: Vec<Diagnostic>,
}

impl CompilationUnit {
    /// Build a unit from source text. Never fails: parse errors become
    /// error-severity diagnostics on the returned unit.
    pub fn parse(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let path = path.into();
        let source: String = source.into();
        let diagnostics = match syn::parse_file(&source) {
            Ok(_) => Vec::new(),
            Err(err) => vec![Diagnostic {
                severity: DiagnosticSeverity::Error,
                message: err.to_string(),
                line: err.span().start().line,
            }],
        };
        Self {
            path,
            source: source.into(),
            diagnostics,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parse the unit's syntax tree. `None` when the source does not parse.
    pub fn ast(&self) -> Option<syn::File> {
        if !self.is_valid() {
            return None;
        }
        syn::parse_file(&self.source).ok()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// True iff the unit has no error-severity diagnostics.
    pub fn is_valid(&self) -> bool {
        !self
            .diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Error)
    }

    /// Non-blank source lines.
    pub fn loc(&self) -> usize {
        self.source.lines().filter(|l| !l.trim().is_empty()).count()
    }

    pub fn line_count(&self) -> usize {
        self.source.lines().count()
    }
}

/// Immutable collection of compilation units keyed by path.
///
/// Never mutated in place: `with_unit` returns a new snapshot that shares
/// every unchanged unit with its parent.
#[derive(Debug, Clone, Default)]
pub struct ProgramSnapshot {
    units: im::HashMap<PathBuf, Arc<CompilationUnit>>,
}

impl ProgramSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_units(units: impl IntoIterator<Item = CompilationUnit>) -> Self {
        let units = units
            .into_iter()
            .map(|u| (u.path().to_path_buf(), Arc::new(u)))
            .collect();
        Self { units }
    }

    pub fn unit(&self, path: &Path) -> Option<&Arc<CompilationUnit>> {
        self.units.get(path)
    }

    /// Returns a new snapshot with `unit` inserted (replacing any previous
    /// unit at the same path). The receiver is unaffected.
    pub fn with_unit(&self, unit: CompilationUnit) -> Self {
        let mut units = self.units.clone();
        units.insert(unit.path().to_path_buf(), Arc::new(unit));
        Self { units }
    }

    pub fn unit_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.units.keys()
    }

    pub fn units(&self) -> impl Iterator<Item = &Arc<CompilationUnit>> {
        self.units.values()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
