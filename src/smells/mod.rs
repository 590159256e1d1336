//! Tree-walking smell detectors feeding the orchestrator.
//!
//! Each detector is an independent pass over one unit with no shared state.
//! Snapshot-level scanning fans units out over a bounded rayon pool and
//! honors a cancellation token at unit granularity: a cancelled scan keeps
//! whatever units already finished.

use crate::cohesion::{extract_types, CohesionAnalyzer};
use crate::config::ReforgeConfig;
use crate::core::source::node_lines;
use crate::core::{CancellationToken, CodeSmell, CompilationUnit, ProgramSnapshot, Severity, SmellType};
use rayon::prelude::*;
use std::collections::HashMap;
use syn::visit::Visit;
use syn::{Block, Item};

/// All smells in one unit.
pub fn scan_unit(unit: &CompilationUnit, config: &ReforgeConfig) -> Vec<CodeSmell> {
    let mut smells = Vec::new();
    let Some(file) = unit.ast() else {
        return smells;
    };

    for function in collect_functions(&file) {
        smells.extend(detect_long_method(unit, &function, config));
        smells.extend(detect_deep_nesting(unit, &function, config));
        smells.extend(detect_long_parameter_list(unit, &function, config));
        smells.extend(detect_switch_on_type(unit, &function, config));
    }
    smells.extend(detect_god_class(unit, config));
    smells.extend(detect_feature_envy(unit));

    smells.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.start_line.cmp(&b.start_line)));
    smells
}

/// Scan every unit of a snapshot in parallel on a pool bounded by
/// `config.jobs`. Units completed before cancellation are returned.
pub fn scan_snapshot(
    snapshot: &ProgramSnapshot,
    config: &ReforgeConfig,
    cancel: &CancellationToken,
) -> Vec<CodeSmell> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs.max(1))
        .build();

    let scan = || {
        snapshot
            .units()
            .collect::<Vec<_>>()
            .par_iter()
            .filter_map(|unit| {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(scan_unit(unit, config))
            })
            .flatten()
            .collect::<Vec<_>>()
    };

    let mut smells = match pool {
        Ok(pool) => pool.install(scan),
        // Pool construction can fail under exotic resource limits; fall back
        // to the global pool rather than dropping the scan.
        Err(_) => scan(),
    };
    smells.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(a.file.cmp(&b.file))
            .then(a.start_line.cmp(&b.start_line))
    });
    smells
}

struct FunctionRecord<'ast> {
    name: String,
    owner: Option<String>,
    params: usize,
    lines: (usize, usize),
    block: &'ast Block,
}

impl FunctionRecord<'_> {
    fn qualified_name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{owner}::{}", self.name),
            None => self.name.clone(),
        }
    }

    fn length(&self) -> usize {
        self.lines.1 - self.lines.0 + 1
    }
}

fn collect_functions(file: &syn::File) -> Vec<FunctionRecord<'_>> {
    let mut functions = Vec::new();
    for item in &file.items {
        match item {
            Item::Fn(f) => functions.push(FunctionRecord {
                name: f.sig.ident.to_string(),
                owner: None,
                params: f.sig.inputs.len(),
                lines: node_lines(f),
                block: &f.block,
            }),
            Item::Impl(i) if i.trait_.is_none() => {
                let owner = match i.self_ty.as_ref() {
                    syn::Type::Path(p) => p.path.segments.last().map(|s| s.ident.to_string()),
                    _ => None,
                };
                for impl_item in &i.items {
                    if let syn::ImplItem::Fn(m) = impl_item {
                        functions.push(FunctionRecord {
                            name: m.sig.ident.to_string(),
                            owner: owner.clone(),
                            params: m
                                .sig
                                .inputs
                                .iter()
                                .filter(|a| matches!(a, syn::FnArg::Typed(_)))
                                .count(),
                            lines: node_lines(m),
                            block: &m.block,
                        });
                    }
                }
            }
            _ => {}
        }
    }
    functions
}

fn escalate(base: Severity, exceeds_double: bool) -> Severity {
    if !exceeds_double {
        return base;
    }
    match base {
        Severity::Low => Severity::Medium,
        Severity::Medium => Severity::High,
        Severity::High | Severity::Critical => Severity::Critical,
    }
}

fn detect_long_method(
    unit: &CompilationUnit,
    function: &FunctionRecord,
    config: &ReforgeConfig,
) -> Option<CodeSmell> {
    let threshold = config.thresholds.long_method_lines;
    let length = function.length();
    (length > threshold).then(|| CodeSmell {
        smell_type: SmellType::LongMethod,
        severity: escalate(Severity::Medium, length > threshold * 2),
        file: unit.path().to_path_buf(),
        start_line: function.lines.0,
        end_line: function.lines.1,
        target_name: function.qualified_name(),
        description: format!(
            "Function '{}' has {} lines (threshold: {})",
            function.qualified_name(),
            length,
            threshold
        ),
    })
}

fn detect_deep_nesting(
    unit: &CompilationUnit,
    function: &FunctionRecord,
    config: &ReforgeConfig,
) -> Option<CodeSmell> {
    let threshold = config.thresholds.deep_nesting;
    let depth = max_nesting(function.block);
    (depth > threshold).then(|| CodeSmell {
        smell_type: SmellType::DeepNesting,
        severity: escalate(Severity::Medium, depth > threshold * 2),
        file: unit.path().to_path_buf(),
        start_line: function.lines.0,
        end_line: function.lines.1,
        target_name: function.qualified_name(),
        description: format!(
            "Function '{}' nests {} levels deep (threshold: {})",
            function.qualified_name(),
            depth,
            threshold
        ),
    })
}

fn detect_long_parameter_list(
    unit: &CompilationUnit,
    function: &FunctionRecord,
    config: &ReforgeConfig,
) -> Option<CodeSmell> {
    let threshold = config.thresholds.long_parameter_list;
    (function.params > threshold).then(|| CodeSmell {
        smell_type: SmellType::LongParameterList,
        severity: escalate(Severity::Medium, function.params > threshold * 2),
        file: unit.path().to_path_buf(),
        start_line: function.lines.0,
        end_line: function.lines.1,
        target_name: function.qualified_name(),
        description: format!(
            "Function '{}' has {} parameters (threshold: {})",
            function.qualified_name(),
            function.params,
            threshold
        ),
    })
}

fn detect_switch_on_type(
    unit: &CompilationUnit,
    function: &FunctionRecord,
    config: &ReforgeConfig,
) -> Option<CodeSmell> {
    let mut finder = MatchFinder {
        min_arms: config.thresholds.min_match_arms,
        largest: 0,
    };
    finder.visit_block(function.block);
    (finder.largest >= config.thresholds.min_match_arms).then(|| CodeSmell {
        smell_type: SmellType::SwitchOnType,
        severity: Severity::Medium,
        file: unit.path().to_path_buf(),
        start_line: function.lines.0,
        end_line: function.lines.1,
        target_name: function.qualified_name(),
        description: format!(
            "Function '{}' dispatches over {} match arms",
            function.qualified_name(),
            finder.largest
        ),
    })
}

fn detect_god_class(unit: &CompilationUnit, config: &ReforgeConfig) -> Vec<CodeSmell> {
    let analyzer = CohesionAnalyzer::new();
    extract_types(unit)
        .into_iter()
        .filter(|ty| ty.methods.len() >= config.thresholds.god_class_methods)
        .map(|ty| {
            let lcom4 = analyzer.calculate_lcom4(&ty);
            let severity = escalate(
                Severity::High,
                ty.methods.len() >= config.thresholds.god_class_methods * 2 || lcom4 >= 3.0,
            );
            CodeSmell {
                smell_type: SmellType::GodClass,
                severity,
                file: unit.path().to_path_buf(),
                start_line: ty.struct_lines.0,
                end_line: ty
                    .impl_ranges
                    .iter()
                    .map(|r| r.1)
                    .max()
                    .unwrap_or(ty.struct_lines.1),
                target_name: ty.name.clone(),
                description: format!(
                    "Type '{}' has {} methods and LCOM4 {:.0}",
                    ty.name,
                    ty.methods.len(),
                    lcom4
                ),
            }
        })
        .collect()
}

/// A method that talks to one foreign receiver more than to its own fields
/// probably belongs there.
fn detect_feature_envy(unit: &CompilationUnit) -> Vec<CodeSmell> {
    let mut smells = Vec::new();
    for ty in extract_types(unit) {
        for method in &ty.methods {
            if !method.has_receiver {
                continue;
            }
            let self_uses = method.fields_used.len();
            let (start, end) = method.lines;
            // Re-walk the body counting method calls by receiver identifier.
            let body = crate::core::source::extract_lines(unit.source(), start, end);
            let envy = foreign_call_counts(&body);
            if let Some((receiver, count)) = envy.into_iter().max_by_key(|&(_, c)| c) {
                if count > self_uses && count >= 3 {
                    smells.push(CodeSmell {
                        smell_type: SmellType::FeatureEnvy,
                        severity: Severity::Medium,
                        file: unit.path().to_path_buf(),
                        start_line: start,
                        end_line: end,
                        target_name: format!("{}::{}", ty.name, method.name),
                        description: format!(
                            "Method '{}' makes {} calls through '{}' but touches only {} own fields",
                            method.name, count, receiver, self_uses
                        ),
                    });
                }
            }
        }
    }
    smells
}

fn foreign_call_counts(method_text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    let Ok(item) = syn::parse_str::<syn::ImplItemFn>(method_text.trim()) else {
        return counts;
    };
    let mut visitor = ForeignCallVisitor {
        counts: &mut counts,
    };
    visitor.visit_block(&item.block);
    counts
}

struct ForeignCallVisitor<'a> {
    counts: &'a mut HashMap<String, usize>,
}

impl<'a, 'ast> Visit<'ast> for ForeignCallVisitor<'a> {
    fn visit_expr_method_call(&mut self, call: &'ast syn::ExprMethodCall) {
        if let syn::Expr::Path(path) = call.receiver.as_ref() {
            if let Some(ident) = path.path.get_ident() {
                if ident != "self" {
                    *self.counts.entry(ident.to_string()).or_insert(0) += 1;
                }
            }
        }
        syn::visit::visit_expr_method_call(self, call);
    }
}

struct MatchFinder {
    min_arms: usize,
    largest: usize,
}

impl<'ast> Visit<'ast> for MatchFinder {
    fn visit_expr_match(&mut self, expr: &'ast syn::ExprMatch) {
        let dispatching = expr
            .arms
            .iter()
            .filter(|arm| is_type_or_constant_pattern(&arm.pat))
            .count();
        if dispatching >= self.min_arms {
            self.largest = self.largest.max(dispatching);
        }
        syn::visit::visit_expr_match(self, expr);
    }
}

fn is_type_or_constant_pattern(pat: &syn::Pat) -> bool {
    matches!(
        pat,
        syn::Pat::Path(_) | syn::Pat::TupleStruct(_) | syn::Pat::Struct(_) | syn::Pat::Lit(_)
    )
}

fn max_nesting(block: &Block) -> u32 {
    struct NestingVisitor {
        depth: u32,
        max: u32,
    }
    impl<'ast> Visit<'ast> for NestingVisitor {
        fn visit_expr(&mut self, expr: &'ast syn::Expr) {
            let nests = matches!(
                expr,
                syn::Expr::If(_)
                    | syn::Expr::While(_)
                    | syn::Expr::ForLoop(_)
                    | syn::Expr::Loop(_)
                    | syn::Expr::Match(_)
            );
            if nests {
                self.depth += 1;
                self.max = self.max.max(self.depth);
            }
            syn::visit::visit_expr(self, expr);
            if nests {
                self.depth -= 1;
            }
        }
    }
    let mut visitor = NestingVisitor { depth: 0, max: 0 };
    visitor.visit_block(block);
    visitor.max
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn config() -> ReforgeConfig {
        ReforgeConfig::default()
    }

    fn unit(source: &str) -> CompilationUnit {
        CompilationUnit::parse("m.rs", source)
    }

    #[test]
    fn long_method_is_flagged_with_location() {
        let mut source = String::from("fn long_one() {\n");
        for i in 0..40 {
            source.push_str(&format!("    let v{i} = {i};\n"));
        }
        source.push_str("}\n");
        let smells = scan_unit(&unit(&source), &config());
        let smell = smells
            .iter()
            .find(|s| s.smell_type == SmellType::LongMethod)
            .unwrap();
        assert_eq!(smell.target_name, "long_one");
        assert_eq!(smell.start_line, 1);
    }

    #[test]
    fn deep_nesting_is_flagged() {
        let source = indoc! {"
            fn nested() {
                if a { if b { if c { if d { if e { work(); } } } } }
            }
        "};
        let smells = scan_unit(&unit(source), &config());
        assert!(smells.iter().any(|s| s.smell_type == SmellType::DeepNesting));
    }

    #[test]
    fn match_dispatch_is_flagged() {
        let source = indoc! {"
            fn dispatch(shape: Shape) -> f64 {
                match shape {
                    Shape::Circle(r) => r * r,
                    Shape::Square(s) => s * s,
                    Shape::Triangle(b, h) => b * h,
                }
            }
        "};
        let smells = scan_unit(&unit(source), &config());
        assert!(smells.iter().any(|s| s.smell_type == SmellType::SwitchOnType));
    }

    #[test]
    fn god_class_requires_method_count() {
        let mut source = String::from("struct Hub { a: u32, b: u32 }\nimpl Hub {\n");
        for i in 0..16 {
            let field = if i % 2 == 0 { "a" } else { "b" };
            source.push_str(&format!("    fn m{i}(&self) -> u32 {{ self.{field} }}\n"));
        }
        source.push_str("}\n");
        let smells = scan_unit(&unit(&source), &config());
        let god = smells
            .iter()
            .find(|s| s.smell_type == SmellType::GodClass)
            .unwrap();
        assert_eq!(god.target_name, "Hub");
    }

    #[test]
    fn cancelled_scan_returns_partial_results() {
        let snapshot = crate::core::ProgramSnapshot::from_units([
            unit("fn ok() {}\n"),
        ]);
        let token = CancellationToken::new();
        token.cancel();
        let smells = scan_snapshot(&snapshot, &config(), &token);
        assert!(smells.is_empty());
    }

    #[test]
    fn snapshot_scan_merges_units() {
        let mut long_fn = String::from("fn big() {\n");
        for i in 0..40 {
            long_fn.push_str(&format!("    let v{i} = {i};\n"));
        }
        long_fn.push_str("}\n");
        let snapshot = crate::core::ProgramSnapshot::from_units([
            CompilationUnit::parse("a.rs", long_fn.as_str()),
            CompilationUnit::parse("b.rs", "fn small() {}\n"),
        ]);
        let smells = scan_snapshot(&snapshot, &config(), &CancellationToken::new());
        assert_eq!(smells.len(), 1);
        assert_eq!(smells[0].file, std::path::PathBuf::from("a.rs"));
    }
}
