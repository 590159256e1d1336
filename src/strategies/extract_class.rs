//! Extract-class: carve one cohesive cluster out of a poorly cohesive type.
//!
//! When a type's LCOM4 exceeds one, its method/field graph has disconnected
//! islands. This strategy lifts the smallest extractable island (at least
//! two methods, strictly fewer than the whole type) into a new type and
//! leaves the original as a facade delegating to it. The smallest island is
//! chosen so the facade keeps its primary responsibility intact.

use crate::cohesion::{extract_types, find_type, CohesionAnalyzer, CohesiveCluster, TypeInfo};
use crate::config::ReforgeConfig;
use crate::core::{CodeSmell, CompilationUnit, ProgramSnapshot, RefactoringType, SmellType};
use crate::strategies::moves::{fields_are_exclusive, rewrite_with_moves, snake_case, MemberMove};
use crate::strategies::{
    replace_unit_source, unchanged, ProposedChanges, RefactoringEstimate, RefactoringStrategy,
};
use anyhow::Result;
use log::debug;
use std::collections::BTreeSet;
use std::path::Path;

pub struct ExtractClass;

impl ExtractClass {
    pub fn new(_config: &ReforgeConfig) -> Self {
        Self
    }

    /// The smallest extractable cluster of `ty`, if the type qualifies.
    fn plan_for(&self, ty: &TypeInfo) -> Option<CohesiveCluster> {
        let analyzer = CohesionAnalyzer::new();
        if analyzer.calculate_lcom4(ty) <= 1.0 {
            return None;
        }
        analyzer
            .identify_responsibilities(ty)
            .into_iter()
            .map(|b| b.cluster)
            .filter(|cluster| {
                cluster.method_names.len() < ty.methods.len()
                    && !moved_fields(ty, cluster).is_empty()
                    && fields_are_exclusive(ty, &cluster.method_names, &moved_fields(ty, cluster))
            })
            .min_by_key(|cluster| cluster.method_names.len())
    }

    fn first_plan(&self, unit: &CompilationUnit) -> Option<(TypeInfo, CohesiveCluster)> {
        extract_types(unit)
            .into_iter()
            .find_map(|ty| self.plan_for(&ty).map(|cluster| (ty, cluster)))
    }

    fn rewrite(&self, unit: &CompilationUnit, ty: &TypeInfo) -> Option<String> {
        let cluster = self.plan_for(ty)?;
        let mv = MemberMove {
            delegate_field: snake_case(&cluster.suggested_name),
            field_names: moved_fields(ty, &cluster),
            method_names: cluster.method_names.clone(),
            new_type: cluster.suggested_name,
        };
        debug!(
            "extracting {} ({} methods) from {}",
            mv.new_type,
            mv.method_names.len(),
            ty.name
        );
        rewrite_with_moves(unit, ty, &[mv])
    }
}

/// Every struct field any cluster method touches. Shared-field components
/// guarantee these fields are not used outside the cluster.
fn moved_fields(ty: &TypeInfo, cluster: &CohesiveCluster) -> Vec<String> {
    let declared: BTreeSet<&str> = ty.fields.iter().map(|f| f.name.as_str()).collect();
    let mut touched: BTreeSet<String> = BTreeSet::new();
    for name in &cluster.method_names {
        if let Some(method) = ty.method(name) {
            touched.extend(
                method
                    .fields_used
                    .iter()
                    .filter(|f| declared.contains(f.as_str()))
                    .cloned(),
            );
        }
    }
    touched.into_iter().collect()
}

impl RefactoringStrategy for ExtractClass {
    fn name(&self) -> &'static str {
        "extract-class"
    }

    fn refactoring_type(&self) -> RefactoringType {
        RefactoringType::ExtractClass
    }

    fn addresses(&self) -> &'static [SmellType] {
        &[SmellType::GodClass, SmellType::FeatureEnvy]
    }

    fn can_apply(&self, unit: &CompilationUnit) -> bool {
        self.first_plan(unit).is_some()
    }

    fn apply(&self, snapshot: &ProgramSnapshot, unit_path: &Path) -> Result<ProgramSnapshot> {
        let Some(unit) = snapshot.unit(unit_path) else {
            return unchanged(snapshot);
        };
        let Some((ty, _)) = self.first_plan(unit) else {
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
        let plan = match smell {
            Some(s) => find_type(unit, &s.target_name)
                .and_then(|ty| self.plan_for(&ty).map(|c| (ty, c))),
            None => self.first_plan(unit),
        };
        let Some((ty, cluster)) = plan else {
            return RefactoringEstimate::rejected("no extractable cohesive cluster");
        };
        let lcom4 = CohesionAnalyzer::new().calculate_lcom4(&ty);
        RefactoringEstimate {
            can_apply: true,
            reason: None,
            complexity_reduction: cluster.total_complexity,
            cohesion_improvement: (lcom4 - 1.0).max(0.0),
            new_class_count: 1,
            proposed_names: vec![cluster.suggested_name],
        }
    }

    fn proposed_changes(&self, unit: &CompilationUnit, smell: &CodeSmell) -> ProposedChanges {
        let Some(ty) = find_type(unit, &smell.target_name) else {
            return ProposedChanges::default();
        };
        let Some(cluster) = self.plan_for(&ty) else {
            return ProposedChanges::default();
        };
        ProposedChanges {
            extracted_classes: vec![cluster.suggested_name],
            extracted_interfaces: Vec::new(),
            moved_members: cluster
                .method_names
                .iter()
                .map(|m| format!("{}::{m}", ty.name))
                .collect(),
        }
    }
}
