//! Split-god-class: decompose an oversized type along responsibility lines.
//!
//! Where extract-class lifts a single island, this strategy rebuilds the
//! whole type: every cohesive cluster becomes its own responsibility type
//! and the original shrinks to a facade holding one delegate per
//! responsibility. Every public method keeps its original name and
//! signature on the facade.

use crate::cohesion::{
    extract_types, find_type, CohesionAnalyzer, ResponsibilityBoundary, TypeInfo,
};
use crate::config::ReforgeConfig;
use crate::core::{CodeSmell, CompilationUnit, ProgramSnapshot, RefactoringType, SmellType};
use crate::strategies::moves::{rewrite_with_moves, snake_case, MemberMove};
use crate::strategies::{
    replace_unit_source, unchanged, ProposedChanges, RefactoringEstimate, RefactoringStrategy,
};
use anyhow::Result;
use log::debug;
use std::collections::BTreeSet;
use std::path::Path;

pub struct SplitGodClass {
    min_methods: usize,
    min_responsibilities: usize,
}

impl SplitGodClass {
    pub fn new(config: &ReforgeConfig) -> Self {
        Self {
            min_methods: config.thresholds.god_class_methods,
            min_responsibilities: config.thresholds.god_class_min_responsibilities,
        }
    }

    fn boundaries(&self, ty: &TypeInfo) -> Vec<ResponsibilityBoundary> {
        if ty.methods.len() < self.min_methods {
            return Vec::new();
        }
        let boundaries = CohesionAnalyzer::new().identify_responsibilities(ty);
        if boundaries.len() < self.min_responsibilities {
            return Vec::new();
        }
        boundaries
    }

    fn plan_moves(&self, ty: &TypeInfo) -> Vec<MemberMove> {
        let declared: BTreeSet<&str> = ty.fields.iter().map(|f| f.name.as_str()).collect();
        let mut used_names: BTreeSet<String> = BTreeSet::new();
        let mut moves = Vec::new();
        for boundary in self.boundaries(ty) {
            let cluster = boundary.cluster;
            let mut field_names: BTreeSet<String> = BTreeSet::new();
            for name in &cluster.method_names {
                if let Some(method) = ty.method(name) {
                    field_names.extend(
                        method
                            .fields_used
                            .iter()
                            .filter(|f| declared.contains(f.as_str()))
                            .cloned(),
                    );
                }
            }
            if field_names.is_empty() {
                continue;
            }
            let new_type = disambiguate(cluster.suggested_name, &mut used_names);
            moves.push(MemberMove {
                delegate_field: snake_case(&new_type),
                field_names: field_names.into_iter().collect(),
                method_names: cluster.method_names,
                new_type,
            });
        }
        moves
    }

    fn first_qualifying(&self, unit: &CompilationUnit) -> Option<TypeInfo> {
        extract_types(unit)
            .into_iter()
            .find(|ty| !self.boundaries(ty).is_empty())
    }

    fn rewrite(&self, unit: &CompilationUnit, ty: &TypeInfo) -> Option<String> {
        let moves = self.plan_moves(ty);
        if moves.len() < self.min_responsibilities {
            return None;
        }
        debug!("splitting {} into {} responsibility types", ty.name, moves.len());
        rewrite_with_moves(unit, ty, &moves)
    }
}

/// Two clusters can share a responsibility label; number the repeats.
fn disambiguate(base: String, used: &mut BTreeSet<String>) -> String {
    let mut name = base.clone();
    let mut n = 2;
    while !used.insert(name.clone()) {
        name = format!("{base}{n}");
        n += 1;
    }
    name
}

impl RefactoringStrategy for SplitGodClass {
    fn name(&self) -> &'static str {
        "split-god-class"
    }

    fn refactoring_type(&self) -> RefactoringType {
        RefactoringType::SplitGodClass
    }

    fn addresses(&self) -> &'static [SmellType] {
        &[SmellType::GodClass]
    }

    fn can_apply(&self, unit: &CompilationUnit) -> bool {
        self.first_qualifying(unit).is_some()
    }

    fn apply(&self, snapshot: &ProgramSnapshot, unit_path: &Path) -> Result<ProgramSnapshot> {
        let Some(unit) = snapshot.unit(unit_path) else {
            return unchanged(snapshot);
        };
        let Some(ty) = self.first_qualifying(unit) else {
            return unchanged(snapshot);
        };
        match self.rewrite(unit, &ty) {
            Some(source) => Ok(replace_unit_source(snapshot, unit_path, source)),
            None => unchanged(snapshot),
        }
    }

    fn apply_targeted(
        &self,
        snapshot: &ProgramSnapshot,
        unit_path: &Path,
        smell: &CodeSmell,
    ) -> Result<ProgramSnapshot> {
        let Some(unit) = snapshot.unit(unit_path) else {
            return unchanged(snapshot);
        };
        let Some(ty) = find_type(unit, &smell.target_name) else {
            return unchanged(snapshot);
        };
        match self.rewrite(unit, &ty) {
            Some(source) => Ok(replace_unit_source(snapshot, unit_path, source)),
            None => unchanged(snapshot),
        }
    }

    fn estimate(&self, unit: &CompilationUnit, smell: Option<&CodeSmell>) -> RefactoringEstimate {
        let ty = match smell {
            Some(s) => find_type(unit, &s.target_name),
            None => self.first_qualifying(unit),
        };
        let Some(ty) = ty else {
            return RefactoringEstimate::rejected("no god class found");
        };
        let moves = self.plan_moves(&ty);
        if moves.len() < self.min_responsibilities {
            return RefactoringEstimate::rejected(format!(
                "{} has fewer than {} separable responsibilities",
                ty.name, self.min_responsibilities
            ));
        }
        let complexity: u32 = self
            .boundaries(&ty)
            .iter()
            .map(|b| b.cluster.total_complexity)
            .sum();
        RefactoringEstimate {
            can_apply: true,
            reason: None,
            complexity_reduction: complexity,
            cohesion_improvement: (moves.len() as f64 - 1.0).max(0.0),
            new_class_count: moves.len(),
            proposed_names: moves.iter().map(|m| m.new_type.clone()).collect(),
        }
    }

    fn proposed_changes(&self, unit: &CompilationUnit, smell: &CodeSmell) -> ProposedChanges {
        let Some(ty) = find_type(unit, &smell.target_name) else {
            return ProposedChanges::default();
        };
        let moves = self.plan_moves(&ty);
        if moves.len() < self.min_responsibilities {
            return ProposedChanges::default();
        }
        ProposedChanges {
            extracted_classes: moves.iter().map(|m| m.new_type.clone()).collect(),
            extracted_interfaces: Vec::new(),
            moved_members: moves
                .iter()
                .flat_map(|m| {
                    m.method_names
                        .iter()
                        .map(|name| format!("{}::{name}", ty.name))
                })
                .collect(),
        }
    }
}
