//! Top-level orchestration: analyze, compare, apply, chain.
//!
//! The orchestrator ties the scanners, strategy family, workspace, and
//! scorer together. Analysis pairs every detected smell with the strategies
//! that address it and ranks the pairings by estimated improvement;
//! comparison forks a branch per strategy; chains walk an ordered list of
//! strategy types against the evolving snapshot, re-deriving smells between
//! steps and stopping at the first step that fails to improve.

use crate::backup::BackupService;
use crate::config::ReforgeConfig;
use crate::core::{
    CancellationToken, CodeSmell, ProgramSnapshot, RefactoringType, Severity,
};
use crate::scoring::{TransformationScore, TransformationScorer};
use crate::smells::scan_snapshot;
use crate::strategies::{
    strategies_for, strategy_of, validate_chain, RefactoringEstimate, RefactoringStrategy,
};
use crate::workspace::{Comparison, VirtualWorkspace};
use anyhow::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One strategy's prediction against one smell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyEstimate {
    pub refactoring_type: RefactoringType,
    pub strategy_name: String,
    pub estimate: RefactoringEstimate,
}

/// A smell paired with the strategies that could remediate it, best first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub smell: CodeSmell,
    pub candidates: Vec<StrategyEstimate>,
}

impl Opportunity {
    /// Ranking key within one severity band.
    pub fn best_improvement(&self) -> f64 {
        self.candidates
            .iter()
            .map(|c| c.estimate.improvement_score())
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PlanSummary {
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefactoringPlan {
    pub opportunities: Vec<Opportunity>,
    pub summary: PlanSummary,
}

/// Outcome of committing the best branch of a comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    pub success: bool,
    pub strategy_name: Option<String>,
    pub modified_units: Vec<PathBuf>,
    pub backup_id: Option<String>,
}

impl ApplyResult {
    fn nothing_to_apply() -> Self {
        Self {
            success: false,
            strategy_name: None,
            modified_units: Vec::new(),
            backup_id: None,
        }
    }
}

/// An ordered list of refactoring types with a remediation goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyChain {
    pub description: String,
    pub steps: Vec<RefactoringType>,
}

impl StrategyChain {
    pub fn new(description: impl Into<String>, steps: Vec<RefactoringType>) -> Self {
        Self {
            description: description.into(),
            steps,
        }
    }

    /// Break the god class up, then abstract what remains.
    pub fn for_god_class() -> Self {
        Self::new(
            "god class decomposition",
            vec![
                RefactoringType::ExtractMethod,
                RefactoringType::SplitGodClass,
                RefactoringType::ExtractInterface,
            ],
        )
    }

    /// Straighten the control flow, then carve out helpers.
    pub fn for_long_method() -> Self {
        Self::new(
            "long method cleanup",
            vec![
                RefactoringType::SimplifyMethod,
                RefactoringType::ExtractMethod,
            ],
        )
    }

    /// Separate responsibilities and expose them behind traits.
    pub fn for_testability() -> Self {
        Self::new(
            "testability improvement",
            vec![
                RefactoringType::ExtractClass,
                RefactoringType::ExtractInterface,
            ],
        )
    }

    /// Attack complexity from every method-level angle.
    pub fn for_complexity() -> Self {
        Self::new(
            "complexity reduction",
            vec![
                RefactoringType::SimplifyMethod,
                RefactoringType::ExtractMethod,
                RefactoringType::ReplaceConditional,
            ],
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub refactoring_type: RefactoringType,
    pub applied: bool,
    pub score: Option<TransformationScore>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResult {
    pub steps_completed: usize,
    pub total_steps: usize,
    pub step_results: Vec<StepResult>,
    pub final_score: Option<f64>,
    pub stopped_at_step: Option<usize>,
    pub stop_reason: Option<String>,
}

impl ChainResult {
    pub fn completed(&self) -> bool {
        self.stopped_at_step.is_none()
    }
}

pub struct Orchestrator {
    config: ReforgeConfig,
    scorer: TransformationScorer,
}

impl Orchestrator {
    pub fn new(config: ReforgeConfig) -> Self {
        Self {
            config,
            scorer: TransformationScorer::new(),
        }
    }

    pub fn config(&self) -> &ReforgeConfig {
        &self.config
    }

    /// Scan the snapshot and rank remediation opportunities at or above
    /// `min_severity`.
    pub fn analyze(&self, snapshot: &ProgramSnapshot, min_severity: Severity) -> RefactoringPlan {
        let cancel = CancellationToken::new();
        let smells = scan_snapshot(snapshot, &self.config, &cancel);
        info!("analysis found {} smells", smells.len());

        let mut summary = PlanSummary::default();
        let mut opportunities = Vec::new();
        for smell in smells {
            if smell.severity < min_severity {
                continue;
            }
            match smell.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }
            let Some(unit) = snapshot.unit(&smell.file) else {
                continue;
            };
            let mut candidates: Vec<StrategyEstimate> = strategies_for(smell.smell_type, &self.config)
                .into_iter()
                .map(|strategy| StrategyEstimate {
                    refactoring_type: strategy.refactoring_type(),
                    strategy_name: strategy.name().to_string(),
                    estimate: strategy.estimate(unit, Some(&smell)),
                })
                .collect();
            candidates.sort_by(|a, b| {
                b.estimate
                    .improvement_score()
                    .partial_cmp(&a.estimate.improvement_score())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            opportunities.push(Opportunity { smell, candidates });
        }

        opportunities.sort_by(|a, b| {
            b.smell
                .severity
                .cmp(&a.smell.severity)
                .then_with(|| {
                    b.best_improvement()
                        .partial_cmp(&a.best_improvement())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });

        RefactoringPlan {
            opportunities,
            summary,
        }
    }

    /// Fork one branch per applicable strategy for the opportunity and rank
    /// the outcomes.
    pub fn compare_strategies(
        &self,
        snapshot: &ProgramSnapshot,
        opportunity: &Opportunity,
    ) -> Comparison {
        let strategies: Vec<Box<dyn RefactoringStrategy>> = opportunity
            .candidates
            .iter()
            .map(|c| strategy_of(c.refactoring_type, &self.config))
            .collect();
        let mut workspace = VirtualWorkspace::new(snapshot.clone());
        workspace.compare(&opportunity.smell.file, &strategies)
    }

    /// Commit the comparison's best branch into `snapshot`, requesting a
    /// backup of the units about to change first.
    pub fn apply_best_strategy(
        &self,
        snapshot: &mut ProgramSnapshot,
        comparison: &Comparison,
        backup: Option<&dyn BackupService>,
    ) -> Result<ApplyResult> {
        let Some(best) = comparison.best_result() else {
            return Ok(ApplyResult::nothing_to_apply());
        };
        let Some(candidate) = best.snapshot.as_ref() else {
            return Ok(ApplyResult::nothing_to_apply());
        };

        let modified_units: Vec<PathBuf> = candidate
            .units()
            .filter(|unit| {
                snapshot
                    .unit(unit.path())
                    .map_or(true, |before| before.source() != unit.source())
            })
            .map(|unit| unit.path().to_path_buf())
            .collect();

        let backup_id = match backup {
            Some(service) => Some(service.create_backup(
                &modified_units,
                &format!("before {}", best.strategy_name),
            )?),
            None => None,
        };

        info!(
            "committing branch {} ({} units modified)",
            best.branch_id,
            modified_units.len()
        );
        *snapshot = candidate.clone();
        Ok(ApplyResult {
            success: true,
            strategy_name: Some(best.strategy_name.clone()),
            modified_units,
            backup_id,
        })
    }

    /// Apply a chain sequentially against the evolving snapshot. Each step
    /// re-derives smells, targets the first one its strategy addresses, and
    /// must strictly improve; the first non-improving step stops the chain
    /// without being committed.
    pub fn apply_strategy_chain(
        &self,
        snapshot: &mut ProgramSnapshot,
        unit_path: &Path,
        chain: &StrategyChain,
    ) -> ChainResult {
        let total_steps = chain.steps.len();
        if let Err(reason) = validate_chain(&chain.steps) {
            return ChainResult {
                steps_completed: 0,
                total_steps,
                step_results: Vec::new(),
                final_score: None,
                stopped_at_step: Some(0),
                stop_reason: Some(reason),
            };
        }

        let mut step_results = Vec::new();
        let mut final_score = None;
        for (index, &step) in chain.steps.iter().enumerate() {
            let strategy = strategy_of(step, &self.config);
            match self.run_chain_step(snapshot, unit_path, strategy.as_ref()) {
                ChainStep::Committed(score) => {
                    final_score = Some(score.overall_score);
                    step_results.push(StepResult {
                        refactoring_type: step,
                        applied: true,
                        score: Some(score),
                    });
                }
                ChainStep::Stopped { score, reason } => {
                    debug!("chain stopped at step {index}: {reason}");
                    step_results.push(StepResult {
                        refactoring_type: step,
                        applied: false,
                        score,
                    });
                    return ChainResult {
                        steps_completed: index,
                        total_steps,
                        step_results,
                        final_score,
                        stopped_at_step: Some(index),
                        stop_reason: Some(reason),
                    };
                }
            }
        }

        ChainResult {
            steps_completed: total_steps,
            total_steps,
            step_results,
            final_score,
            stopped_at_step: None,
            stop_reason: None,
        }
    }

    fn run_chain_step(
        &self,
        snapshot: &mut ProgramSnapshot,
        unit_path: &Path,
        strategy: &dyn RefactoringStrategy,
    ) -> ChainStep {
        let Some(unit) = snapshot.unit(unit_path) else {
            return ChainStep::Stopped {
                score: None,
                reason: format!("unit {} not in snapshot", unit_path.display()),
            };
        };
        if !strategy.can_apply(unit) {
            return ChainStep::Stopped {
                score: None,
                reason: format!("{} preconditions not met", strategy.name()),
            };
        }

        // Re-derive smells against the current snapshot so each step targets
        // what actually remains after its predecessors.
        let smell = crate::smells::scan_unit(unit, &self.config)
            .into_iter()
            .find(|s| strategy.addresses().contains(&s.smell_type));

        let applied = match &smell {
            Some(smell) => strategy.apply_targeted(snapshot, unit_path, smell),
            None => strategy.apply(snapshot, unit_path),
        };
        let candidate = match applied {
            Ok(candidate) => candidate,
            Err(err) => {
                return ChainStep::Stopped {
                    score: None,
                    reason: err.to_string(),
                }
            }
        };
        let Some(candidate_unit) = candidate.unit(unit_path) else {
            return ChainStep::Stopped {
                score: None,
                reason: format!("unit {} missing after step", unit_path.display()),
            };
        };

        let baseline_unit = snapshot.unit(unit_path).expect("checked above");
        let score = self.scorer.score(baseline_unit, candidate_unit);
        if score.is_fatal() {
            return ChainStep::Stopped {
                score: Some(score),
                reason: "step produced an unparsable unit".to_string(),
            };
        }
        if !score.semantics_preserved {
            return ChainStep::Stopped {
                score: Some(score),
                reason: "step dropped public members".to_string(),
            };
        }
        if baseline_unit.source() == candidate_unit.source() {
            return ChainStep::Stopped {
                score: Some(score),
                reason: "step made no change".to_string(),
            };
        }
        if score.overall_score <= 0.0 {
            return ChainStep::Stopped {
                score: Some(score),
                reason: "step did not improve the unit".to_string(),
            };
        }

        *snapshot = candidate;
        ChainStep::Committed(score)
    }
}

enum ChainStep {
    Committed(TransformationScore),
    Stopped {
        score: Option<TransformationScore>,
        reason: String,
    },
}
