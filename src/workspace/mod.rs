//! The branching virtual workspace.
//!
//! One baseline snapshot, many isolated branches. Each strategy under
//! comparison gets its own uniquely named branch forked from the baseline;
//! evaluation runs in parallel and every failure mode a strategy can
//! exhibit (error return, panic, vanished unit) is captured into a failed
//! branch instead of propagating, so sibling branches always finish.
//! Ranking only ever sees branches that produced a scorable candidate.

use crate::core::{CompilationUnit, ProgramSnapshot, RefactoringType};
use crate::diff::{diff_units, DocumentDiff};
use crate::scoring::{TransformationScore, TransformationScorer};
use crate::strategies::RefactoringStrategy;
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("no branch named '{0}'")]
    UnknownBranch(String),
}

/// One scored branch: the candidate snapshot plus its evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchResult {
    pub strategy_name: String,
    pub refactoring_type: RefactoringType,
    pub branch_id: String,
    pub score: TransformationScore,
    pub diff: DocumentDiff,
    #[serde(skip)]
    pub snapshot: Option<ProgramSnapshot>,
}

impl BranchResult {
    pub fn overall_score(&self) -> f64 {
        self.score.overall_score
    }

    /// A branch the orchestrator could actually commit.
    pub fn is_viable(&self) -> bool {
        !self.score.is_fatal()
    }
}

/// A branch whose strategy errored, panicked, or lost the target unit.
/// Failed branches never rank; they are reported alongside the results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedBranch {
    pub strategy_name: String,
    pub refactoring_type: RefactoringType,
    pub branch_id: String,
    pub error: String,
}

/// Branch outcomes for one unit. `results` holds only branches that
/// produced a scorable candidate, ranked best first; strategies that threw
/// land in `failed_results`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub unit_path: PathBuf,
    pub results: Vec<BranchResult>,
    pub failed_results: Vec<FailedBranch>,
}

impl Comparison {
    /// The best viable branch, if any scored above fatal.
    pub fn best_result(&self) -> Option<&BranchResult> {
        self.results.iter().find(|r| r.is_viable())
    }
}

pub struct VirtualWorkspace {
    baseline: ProgramSnapshot,
    branches: HashMap<String, ProgramSnapshot>,
    scorer: TransformationScorer,
}

impl VirtualWorkspace {
    pub fn new(baseline: ProgramSnapshot) -> Self {
        Self {
            baseline,
            branches: HashMap::new(),
            scorer: TransformationScorer::new(),
        }
    }

    pub fn baseline(&self) -> &ProgramSnapshot {
        &self.baseline
    }

    pub fn branch(&self, id: &str) -> Option<&ProgramSnapshot> {
        self.branches.get(id)
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Make `id`'s content the new baseline and drop every branch.
    pub fn commit_branch(&mut self, id: &str) -> Result<(), WorkspaceError> {
        let snapshot = self
            .branches
            .remove(id)
            .ok_or_else(|| WorkspaceError::UnknownBranch(id.to_string()))?;
        self.baseline = snapshot;
        self.branches.clear();
        Ok(())
    }

    /// Evaluate every applicable strategy against its own branch of the
    /// baseline. Branches run in parallel; ranking waits for all of them.
    pub fn compare(
        &mut self,
        unit_path: &Path,
        strategies: &[Box<dyn RefactoringStrategy>],
    ) -> Comparison {
        let Some(baseline_unit) = self.baseline.unit(unit_path) else {
            warn!("compare: unit {} not in snapshot", unit_path.display());
            return Comparison {
                unit_path: unit_path.to_path_buf(),
                results: Vec::new(),
                failed_results: Vec::new(),
            };
        };

        let applicable: Vec<&dyn RefactoringStrategy> = strategies
            .iter()
            .map(AsRef::as_ref)
            .filter(|s| s.can_apply(baseline_unit))
            .collect();
        debug!(
            "comparing {} applicable strategies on {}",
            applicable.len(),
            unit_path.display()
        );

        let evaluated: Vec<Result<BranchResult, FailedBranch>> = applicable
            .par_iter()
            .map(|strategy| self.evaluate(unit_path, baseline_unit, *strategy))
            .collect();

        let mut results = Vec::new();
        let mut failed_results = Vec::new();
        for branch in evaluated {
            match branch {
                Ok(result) => results.push(result),
                Err(failed) => failed_results.push(failed),
            }
        }

        results.sort_by(|a, b| {
            b.overall_score()
                .partial_cmp(&a.overall_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for result in &results {
            if let Some(snapshot) = &result.snapshot {
                self.branches
                    .insert(result.branch_id.clone(), snapshot.clone());
            }
        }

        Comparison {
            unit_path: unit_path.to_path_buf(),
            results,
            failed_results,
        }
    }

    fn evaluate(
        &self,
        unit_path: &Path,
        baseline_unit: &CompilationUnit,
        strategy: &dyn RefactoringStrategy,
    ) -> Result<BranchResult, FailedBranch> {
        let branch_id = format!("{}-{}", strategy.name(), Uuid::new_v4());
        let applied =
            catch_unwind(AssertUnwindSafe(|| strategy.apply(&self.baseline, unit_path)));

        let error = match applied {
            Ok(Ok(candidate)) => {
                let evaluated = candidate.unit(unit_path).map(|candidate_unit| {
                    (
                        self.scorer.score(baseline_unit, candidate_unit),
                        diff_units(baseline_unit, candidate_unit),
                    )
                });
                match evaluated {
                    Some((score, diff)) => {
                        return Ok(BranchResult {
                            strategy_name: strategy.name().to_string(),
                            refactoring_type: strategy.refactoring_type(),
                            branch_id,
                            score,
                            diff,
                            snapshot: Some(candidate),
                        });
                    }
                    None => format!("unit {} missing after transformation", unit_path.display()),
                }
            }
            Ok(Err(err)) => err.to_string(),
            Err(panic) => panic_message(panic),
        };

        warn!("branch {branch_id} failed: {error}");
        Err(FailedBranch {
            strategy_name: strategy.name().to_string(),
            refactoring_type: strategy.refactoring_type(),
            branch_id,
            error,
        })
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("strategy panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("strategy panicked: {message}")
    } else {
        "strategy panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CodeSmell, SmellType};
    use crate::scoring::FATAL_SCORE;
    use crate::strategies::{ProposedChanges, RefactoringEstimate};
    use anyhow::Result;
    use indoc::indoc;

    const BASELINE: &str = indoc! {"
        pub fn work(x: u32) -> u32 {
            if x > 0 {
                if x > 1 {
                    return x * 2;
                }
            }
            x
        }
    "};

    fn snapshot_of(source: &str) -> ProgramSnapshot {
        ProgramSnapshot::from_units(vec![CompilationUnit::parse("work.rs", source)])
    }

    /// Test double that rewrites the unit to a fixed source, errors, or
    /// panics, depending on construction.
    struct Scripted {
        name: &'static str,
        ty: RefactoringType,
        behavior: Behavior,
    }

    enum Behavior {
        Rewrite(&'static str),
        Fail(&'static str),
        Panic(&'static str),
    }

    impl RefactoringStrategy for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        fn refactoring_type(&self) -> RefactoringType {
            self.ty
        }

        fn addresses(&self) -> &'static [SmellType] {
            &[SmellType::LongMethod]
        }

        fn can_apply(&self, _unit: &CompilationUnit) -> bool {
            true
        }

        fn apply(&self, snapshot: &ProgramSnapshot, unit_path: &Path) -> Result<ProgramSnapshot> {
            match &self.behavior {
                Behavior::Rewrite(source) => Ok(snapshot.with_unit(CompilationUnit::parse(
                    unit_path,
                    source.to_string(),
                ))),
                Behavior::Fail(message) => Err(anyhow::anyhow!(*message)),
                Behavior::Panic(message) => panic!("{message}"),
            }
        }

        fn apply_targeted(
            &self,
            snapshot: &ProgramSnapshot,
            unit_path: &Path,
            _smell: &CodeSmell,
        ) -> Result<ProgramSnapshot> {
            self.apply(snapshot, unit_path)
        }

        fn estimate(
            &self,
            _unit: &CompilationUnit,
            _smell: Option<&CodeSmell>,
        ) -> RefactoringEstimate {
            RefactoringEstimate::rejected("scripted")
        }

        fn proposed_changes(&self, _unit: &CompilationUnit, _smell: &CodeSmell) -> ProposedChanges {
            ProposedChanges::default()
        }
    }

    fn scripted(name: &'static str, ty: RefactoringType, behavior: Behavior) -> Box<dyn RefactoringStrategy> {
        Box::new(Scripted { name, ty, behavior })
    }

    #[test]
    fn failures_are_isolated_and_viable_branch_wins() {
        let mut workspace = VirtualWorkspace::new(snapshot_of(BASELINE));
        let strategies = vec![
            scripted(
                "panicker",
                RefactoringType::ExtractMethod,
                Behavior::Panic("boom"),
            ),
            scripted(
                "simplifier",
                RefactoringType::SimplifyMethod,
                // Same public surface, strictly less branching.
                Behavior::Rewrite("pub fn work(x: u32) -> u32 {\n    x\n}\n"),
            ),
            scripted(
                "breaker",
                RefactoringType::ReplaceConditional,
                Behavior::Rewrite("pub fn work(x: u32) -> u32 {\n"),
            ),
        ];

        let comparison = workspace.compare("work.rs".as_ref(), &strategies);

        // The thrown strategy never reaches the ranked results.
        assert_eq!(comparison.results.len(), 2);
        assert!(comparison
            .results
            .iter()
            .all(|r| r.strategy_name != "panicker"));
        assert_eq!(comparison.failed_results.len(), 1);
        let panicker = &comparison.failed_results[0];
        assert_eq!(panicker.strategy_name, "panicker");
        assert!(panicker.error.contains("boom"));

        let best = comparison.best_result().expect("one branch is viable");
        assert_eq!(best.strategy_name, "simplifier");
        assert!(best.score.is_improvement());

        // The unparsable rewrite still scores, fatally, and stays ranked.
        let breaker = comparison
            .results
            .iter()
            .find(|r| r.strategy_name == "breaker")
            .unwrap();
        assert_eq!(breaker.overall_score(), FATAL_SCORE);
        assert!(!breaker.is_viable());
    }

    #[test]
    fn erroring_strategy_lands_in_failed_results() {
        let mut workspace = VirtualWorkspace::new(snapshot_of(BASELINE));
        let strategies = vec![scripted(
            "failer",
            RefactoringType::ExtractClass,
            Behavior::Fail("no cluster"),
        )];
        let comparison = workspace.compare("work.rs".as_ref(), &strategies);
        assert!(comparison.results.is_empty());
        assert_eq!(comparison.failed_results.len(), 1);
        assert_eq!(comparison.failed_results[0].error, "no cluster");
        assert!(comparison.best_result().is_none());
    }

    #[test]
    fn results_are_ranked_by_score_descending() {
        let mut workspace = VirtualWorkspace::new(snapshot_of(BASELINE));
        let strategies = vec![
            scripted(
                "breaker",
                RefactoringType::ReplaceConditional,
                Behavior::Rewrite("pub fn work(x: u32) -> u32 {\n"),
            ),
            scripted(
                "simplifier",
                RefactoringType::SimplifyMethod,
                Behavior::Rewrite("pub fn work(x: u32) -> u32 {\n    x\n}\n"),
            ),
        ];
        let comparison = workspace.compare("work.rs".as_ref(), &strategies);
        let scores: Vec<f64> = comparison.results.iter().map(|r| r.overall_score()).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(comparison.results[0].strategy_name, "simplifier");
    }

    #[test]
    fn branch_ids_stay_unique_across_calls() {
        let mut workspace = VirtualWorkspace::new(snapshot_of(BASELINE));
        let strategies = vec![scripted(
            "simplifier",
            RefactoringType::SimplifyMethod,
            Behavior::Rewrite("pub fn work(x: u32) -> u32 {\n    x\n}\n"),
        )];
        let first = workspace.compare("work.rs".as_ref(), &strategies);
        let second = workspace.compare("work.rs".as_ref(), &strategies);
        assert_ne!(
            first.results[0].branch_id,
            second.results[0].branch_id
        );
        assert_eq!(workspace.branch_count(), 2);
    }

    #[test]
    fn committing_a_branch_replaces_the_baseline() {
        let mut workspace = VirtualWorkspace::new(snapshot_of(BASELINE));
        let strategies = vec![scripted(
            "simplifier",
            RefactoringType::SimplifyMethod,
            Behavior::Rewrite("pub fn work(x: u32) -> u32 {\n    x\n}\n"),
        )];
        let comparison = workspace.compare("work.rs".as_ref(), &strategies);
        let id = comparison.best_result().unwrap().branch_id.clone();
        workspace.commit_branch(&id).unwrap();
        assert_eq!(
            workspace.baseline().unit("work.rs".as_ref()).unwrap().source(),
            "pub fn work(x: u32) -> u32 {\n    x\n}\n"
        );
        assert_eq!(workspace.branch_count(), 0);
        assert!(workspace.commit_branch(&id).is_err());
    }

    #[test]
    fn unknown_unit_yields_empty_comparison() {
        let mut workspace = VirtualWorkspace::new(snapshot_of(BASELINE));
        let comparison = workspace.compare("missing.rs".as_ref(), &[]);
        assert!(comparison.results.is_empty());
        assert!(comparison.failed_results.is_empty());
        assert!(comparison.best_result().is_none());
    }
}
