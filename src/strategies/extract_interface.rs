//! Extract-interface: lift a wide public surface into a trait.
//!
//! A type with a large public method surface couples callers to the
//! concrete type. This strategy synthesizes a trait mirroring every public
//! receiver method and a forwarding impl, so callers can depend on the
//! abstraction while the inherent methods stay untouched.

use crate::cohesion::{extract_types, find_type, MethodInfo, TypeInfo};
use crate::config::ReforgeConfig;
use crate::core::source::{apply_edits, Edit};
use crate::core::{CodeSmell, CompilationUnit, ProgramSnapshot, RefactoringType, SmellType};
use crate::strategies::{
    replace_unit_source, unchanged, ProposedChanges, RefactoringEstimate, RefactoringStrategy,
};
use anyhow::Result;
use log::debug;
use std::path::Path;

pub struct ExtractInterface {
    min_public: usize,
}

impl ExtractInterface {
    pub fn new(config: &ReforgeConfig) -> Self {
        Self {
            min_public: config.thresholds.extract_interface_min_public,
        }
    }

    fn abstractable<'a>(&self, ty: &'a TypeInfo) -> Vec<&'a MethodInfo> {
        ty.public_methods().filter(|m| m.has_receiver).collect()
    }

    fn qualifies(&self, unit: &CompilationUnit, ty: &TypeInfo) -> bool {
        self.abstractable(ty).len() >= self.min_public
            && !unit.source().contains(&trait_name(&ty.name))
    }

    fn first_qualifying(&self, unit: &CompilationUnit) -> Option<TypeInfo> {
        extract_types(unit)
            .into_iter()
            .find(|ty| self.qualifies(unit, ty))
    }

    fn rewrite(&self, unit: &CompilationUnit, ty: &TypeInfo) -> Option<String> {
        if !self.qualifies(unit, ty) {
            return None;
        }
        let methods = self.abstractable(ty);
        let name = trait_name(&ty.name);
        let vis = if ty.is_public { "pub " } else { "" };
        debug!("abstracting {} methods of {} into {name}", methods.len(), ty.name);

        let mut text = format!("\n{vis}trait {name} {{\n");
        for method in &methods {
            text.push_str(&format!("    {};\n", method.signature_text()));
        }
        text.push_str("}\n\n");
        text.push_str(&format!("impl {name} for {} {{\n", ty.name));
        for (i, method) in methods.iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            let args = method.argument_names();
            let forwarded = if args.is_empty() {
                "self".to_string()
            } else {
                format!("self, {args}")
            };
            text.push_str(&format!(
                "    {} {{\n        {}::{}({forwarded})\n    }}\n",
                method.signature_text(),
                ty.name,
                method.name
            ));
        }
        text.push_str("}\n");

        let edits = vec![Edit::InsertAfter {
            line: unit.line_count(),
            text,
        }];
        Some(apply_edits(unit.source(), edits))
    }
}

fn trait_name(type_name: &str) -> String {
    format!("{type_name}Contract")
}

impl RefactoringStrategy for ExtractInterface {
    fn name(&self) -> &'static str {
        "extract-interface"
    }

    fn refactoring_type(&self) -> RefactoringType {
        RefactoringType::ExtractInterface
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
        let Some(ty) = ty.filter(|t| self.qualifies(unit, t)) else {
            return RefactoringEstimate::rejected(format!(
                "no type with {} or more public methods",
                self.min_public
            ));
        };
        RefactoringEstimate {
            can_apply: true,
            reason: None,
            complexity_reduction: 0,
            cohesion_improvement: 0.0,
            new_class_count: 1,
            proposed_names: vec![trait_name(&ty.name)],
        }
    }

    fn proposed_changes(&self, unit: &CompilationUnit, smell: &CodeSmell) -> ProposedChanges {
        let Some(ty) = find_type(unit, &smell.target_name).filter(|t| self.qualifies(unit, t))
        else {
            return ProposedChanges::default();
        };
        ProposedChanges {
            extracted_classes: Vec::new(),
            extracted_interfaces: vec![trait_name(&ty.name)],
            moved_members: Vec::new(),
        }
    }
}
