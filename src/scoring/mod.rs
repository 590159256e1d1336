//! Quality delta scoring between a baseline unit and a transformed candidate.
//!
//! Deltas are candidate minus baseline, so negative complexity/LOC deltas and
//! positive maintainability deltas are improvements. A candidate that fails
//! to parse is fatal (-100) and never a viable pick; one that drops public
//! surface is strongly penalized (-50) but kept for transparency.

use crate::complexity::{analyze_unit, UnitMetrics};
use crate::core::CompilationUnit;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use syn::Item;

pub const FATAL_SCORE: f64 = -100.0;
pub const CONTRACT_BROKEN_SCORE: f64 = -50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationScore {
    pub complexity_delta: i64,
    pub cognitive_complexity_delta: i64,
    pub loc_delta: i64,
    pub maintainability_delta: f64,
    pub compilation_valid: bool,
    pub semantics_preserved: bool,
    pub overall_score: f64,
}

impl TransformationScore {
    pub fn is_fatal(&self) -> bool {
        !self.compilation_valid
    }

    pub fn is_improvement(&self) -> bool {
        self.compilation_valid && self.semantics_preserved && self.overall_score > 0.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransformationScorer;

impl TransformationScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(
        &self,
        baseline: &CompilationUnit,
        candidate: &CompilationUnit,
    ) -> TransformationScore {
        let before = analyze_unit(baseline);
        let after = analyze_unit(candidate);

        let compilation_valid = candidate.is_valid();
        let semantics_preserved = public_surface(candidate).is_superset(&public_surface(baseline));

        let complexity_delta = i64::from(after.cyclomatic) - i64::from(before.cyclomatic);
        let cognitive_delta = i64::from(after.cognitive) - i64::from(before.cognitive);
        let loc_delta = after.loc as i64 - before.loc as i64;
        let maintainability_delta = after.maintainability_index - before.maintainability_index;

        let overall_score = overall(
            &before,
            &after,
            compilation_valid,
            semantics_preserved,
        );

        TransformationScore {
            complexity_delta,
            cognitive_complexity_delta: cognitive_delta,
            loc_delta,
            maintainability_delta,
            compilation_valid,
            semantics_preserved,
            overall_score,
        }
    }
}

fn overall(
    before: &UnitMetrics,
    after: &UnitMetrics,
    compilation_valid: bool,
    semantics_preserved: bool,
) -> f64 {
    if !compilation_valid {
        return FATAL_SCORE;
    }
    if !semantics_preserved {
        return CONTRACT_BROKEN_SCORE;
    }
    let complexity_delta = f64::from(after.cyclomatic) - f64::from(before.cyclomatic);
    let cognitive_delta = f64::from(after.cognitive) - f64::from(before.cognitive);
    let loc_delta = after.loc as f64 - before.loc as f64;
    let maintainability_delta = after.maintainability_index - before.maintainability_index;

    let score = 50.0 - 2.0 * complexity_delta - 3.0 * cognitive_delta - 0.5 * loc_delta
        + 2.0 * maintainability_delta;
    score.clamp(-100.0, 100.0)
}

/// Names of all publicly visible members of a unit: public items plus public
/// methods of inherent impls. Name-level only; signatures are not compared.
pub fn public_surface(unit: &CompilationUnit) -> HashSet<String> {
    let mut names = HashSet::new();
    let Some(file) = unit.ast() else {
        return names;
    };
    for item in &file.items {
        match item {
            Item::Fn(f) if is_public(&f.vis) => {
                names.insert(f.sig.ident.to_string());
            }
            Item::Struct(s) if is_public(&s.vis) => {
                names.insert(s.ident.to_string());
            }
            Item::Enum(e) if is_public(&e.vis) => {
                names.insert(e.ident.to_string());
            }
            Item::Trait(t) if is_public(&t.vis) => {
                names.insert(t.ident.to_string());
            }
            Item::Impl(i) if i.trait_.is_none() => {
                for impl_item in &i.items {
                    if let syn::ImplItem::Fn(m) = impl_item {
                        if is_public(&m.vis) {
                            names.insert(m.sig.ident.to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }
    names
}

fn is_public(vis: &syn::Visibility) -> bool {
    matches!(vis, syn::Visibility::Public(_))
}
