pub mod cognitive;
pub mod cyclomatic;
pub mod halstead;
pub mod maintainability;

pub use cognitive::calculate_cognitive;
pub use cyclomatic::calculate_cyclomatic;
pub use halstead::{measure_source, HalsteadMetrics};
pub use maintainability::maintainability_index;

use crate::core::CompilationUnit;
use serde::{Deserialize, Serialize};
use syn::visit::Visit;

/// Aggregate quality metrics for one compilation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitMetrics {
    pub cyclomatic: u32,
    pub cognitive: u32,
    pub halstead_volume: f64,
    pub maintainability_index: f64,
    pub loc: usize,
}

/// Compute all metrics for a unit. An unparsable unit measures as empty
/// except for its line count; validity is reported separately by scoring.
pub fn analyze_unit(unit: &CompilationUnit) -> UnitMetrics {
    let loc = unit.loc();
    let (cyclomatic, cognitive) = match unit.ast() {
        Some(file) => {
            let mut collector = FunctionCollector::default();
            collector.visit_file(&file);
            (collector.cyclomatic, collector.cognitive)
        }
        None => (0, 0),
    };
    let volume = measure_source(unit.source()).volume();
    UnitMetrics {
        cyclomatic,
        cognitive,
        halstead_volume: volume,
        maintainability_index: maintainability_index(volume, cyclomatic, loc),
        loc,
    }
}

#[derive(Default)]
struct FunctionCollector {
    cyclomatic: u32,
    cognitive: u32,
}

impl<'ast> Visit<'ast> for FunctionCollector {
    fn visit_item_fn(&mut self, item: &'ast syn::ItemFn) {
        self.cyclomatic += calculate_cyclomatic(&item.block);
        self.cognitive += calculate_cognitive(&item.block);
    }

    fn visit_impl_item_fn(&mut self, item: &'ast syn::ImplItemFn) {
        self.cyclomatic += calculate_cyclomatic(&item.block);
        self.cognitive += calculate_cognitive(&item.block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_sum_over_functions() {
        let unit = CompilationUnit::parse(
            "m.rs",
            "fn a() { if x { } }\nfn b() { if y { } if z { } }\n",
        );
        let metrics = analyze_unit(&unit);
        // a: 1+1, b: 1+2
        assert_eq!(metrics.cyclomatic, 5);
        assert_eq!(metrics.loc, 2);
    }

    #[test]
    fn impl_methods_are_included() {
        let unit = CompilationUnit::parse(
            "m.rs",
            "struct S;\nimpl S {\n    fn m(&self) { if x { } }\n}\n",
        );
        assert_eq!(analyze_unit(&unit).cyclomatic, 2);
    }

    #[test]
    fn unparsable_unit_measures_empty() {
        let unit = CompilationUnit::parse("bad.rs", "fn broken( {");
        let metrics = analyze_unit(&unit);
        assert_eq!(metrics.cyclomatic, 0);
        assert_eq!(metrics.cognitive, 0);
    }
}
