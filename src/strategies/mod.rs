//! The polymorphic family of transformation strategies.
//!
//! Every strategy implements the same contract: a cheap applicability probe,
//! a whole-unit transformation, a smell-targeted transformation, a
//! non-committing estimate, and a preview of intended changes. Strategies
//! never mutate a snapshot; they return a new one, and they degrade to
//! no-ops (input returned unchanged) whenever preconditions fail or the
//! target cannot be located.

pub mod composition;
pub mod extract_class;
pub mod extract_interface;
pub mod extract_method;
pub(crate) mod moves;
pub mod replace_conditional;
pub mod simplify_method;
pub mod split_god_class;

pub use composition::{can_compose_with, composition_order, validate_chain, CompositionOrder};
pub use extract_class::ExtractClass;
pub use extract_interface::ExtractInterface;
pub use extract_method::ExtractMethod;
pub use replace_conditional::ReplaceConditional;
pub use simplify_method::SimplifyMethod;
pub use split_god_class::SplitGodClass;

use crate::config::ReforgeConfig;
use crate::core::{CodeSmell, CompilationUnit, ProgramSnapshot, RefactoringType, SmellType};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cheap, non-committing prediction of what a strategy would achieve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefactoringEstimate {
    pub can_apply: bool,
    /// Human-readable reason when `can_apply` is false.
    pub reason: Option<String>,
    pub complexity_reduction: u32,
    pub cohesion_improvement: f64,
    pub new_class_count: usize,
    pub proposed_names: Vec<String>,
}

impl RefactoringEstimate {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            can_apply: false,
            reason: Some(reason.into()),
            complexity_reduction: 0,
            cohesion_improvement: 0.0,
            new_class_count: 0,
            proposed_names: Vec::new(),
        }
    }

    /// Ranking key: complexity wins, cohesion breaks ties.
    pub fn improvement_score(&self) -> f64 {
        if !self.can_apply {
            return 0.0;
        }
        f64::from(self.complexity_reduction) + self.cohesion_improvement
    }
}

/// Preview of the declarations a transformation would produce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposedChanges {
    pub extracted_classes: Vec<String>,
    pub extracted_interfaces: Vec<String>,
    pub moved_members: Vec<String>,
}

pub trait RefactoringStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn refactoring_type(&self) -> RefactoringType;

    /// Smell types this strategy can remediate.
    fn addresses(&self) -> &'static [SmellType];

    /// Cheap applicability probe against one unit.
    fn can_apply(&self, unit: &CompilationUnit) -> bool;

    /// Whole-unit best-effort transformation.
    fn apply(&self, snapshot: &ProgramSnapshot, unit_path: &Path) -> Result<ProgramSnapshot>;

    /// Transformation scoped to one smell's target. Must return the input
    /// snapshot unchanged when the target cannot be located.
    fn apply_targeted(
        &self,
        snapshot: &ProgramSnapshot,
        unit_path: &Path,
        smell: &CodeSmell,
    ) -> Result<ProgramSnapshot>;

    /// Predict the transformation without performing it.
    fn estimate(&self, unit: &CompilationUnit, smell: Option<&CodeSmell>) -> RefactoringEstimate;

    /// Describe the declarations and moves the transformation intends.
    fn proposed_changes(&self, unit: &CompilationUnit, smell: &CodeSmell) -> ProposedChanges;
}

/// Every strategy the engine knows, configured from `config`.
pub fn all_strategies(config: &ReforgeConfig) -> Vec<Box<dyn RefactoringStrategy>> {
    RefactoringType::ALL
        .iter()
        .map(|ty| strategy_of(*ty, config))
        .collect()
}

/// Construct the single strategy for a refactoring type.
pub fn strategy_of(ty: RefactoringType, config: &ReforgeConfig) -> Box<dyn RefactoringStrategy> {
    match ty {
        RefactoringType::SimplifyMethod => Box::new(SimplifyMethod::new(config)),
        RefactoringType::ExtractMethod => Box::new(ExtractMethod::new(config)),
        RefactoringType::ExtractClass => Box::new(ExtractClass::new(config)),
        RefactoringType::ExtractInterface => Box::new(ExtractInterface::new(config)),
        RefactoringType::SplitGodClass => Box::new(SplitGodClass::new(config)),
        RefactoringType::ReplaceConditional => Box::new(ReplaceConditional::new(config)),
    }
}

/// Strategies whose `addresses` set includes the given smell type.
pub fn strategies_for(
    smell: SmellType,
    config: &ReforgeConfig,
) -> Vec<Box<dyn RefactoringStrategy>> {
    all_strategies(config)
        .into_iter()
        .filter(|s| s.addresses().contains(&smell))
        .collect()
}

/// Shared no-op helper: hand back the snapshot unchanged.
pub(crate) fn unchanged(snapshot: &ProgramSnapshot) -> Result<ProgramSnapshot> {
    Ok(snapshot.clone())
}

/// Replace one unit's source in a snapshot, re-parsing it.
pub(crate) fn replace_unit_source(
    snapshot: &ProgramSnapshot,
    path: &Path,
    source: String,
) -> ProgramSnapshot {
    snapshot.with_unit(CompilationUnit::parse(path, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_refactoring_type_has_a_strategy() {
        let config = ReforgeConfig::default();
        let strategies = all_strategies(&config);
        assert_eq!(strategies.len(), RefactoringType::ALL.len());
        for (strategy, ty) in strategies.iter().zip(RefactoringType::ALL) {
            assert_eq!(strategy.refactoring_type(), ty);
        }
    }

    #[test]
    fn god_class_smell_has_multiple_remediations() {
        let config = ReforgeConfig::default();
        let candidates = strategies_for(SmellType::GodClass, &config);
        let types: Vec<_> = candidates.iter().map(|s| s.refactoring_type()).collect();
        assert!(types.contains(&RefactoringType::SplitGodClass));
        assert!(types.contains(&RefactoringType::ExtractClass));
    }
}
