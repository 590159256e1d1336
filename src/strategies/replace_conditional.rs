//! Replace-conditional: turn a type-dispatching match into named handlers.
//!
//! A match whose arms dispatch on variants or constants gets each arm body
//! lifted into its own handler function, and the match rewritten to one
//! delegating call per arm. Only binding-free patterns qualify, and a body
//! that reads surrounding locals pins the whole match in place; wildcard
//! arms stay inline.

use crate::config::ReforgeConfig;
use crate::core::source::{apply_edits, indent_of_line, node_lines, Edit};
use crate::core::{CodeSmell, CompilationUnit, ProgramSnapshot, RefactoringType, SmellType};
use crate::strategies::{
    replace_unit_source, unchanged, ProposedChanges, RefactoringEstimate, RefactoringStrategy,
};
use anyhow::Result;
use log::debug;
use quote::ToTokens;
use std::collections::BTreeSet;
use std::path::Path;
use syn::visit::Visit;
use syn::{Expr, Item, Pat, Stmt};

pub struct ReplaceConditional {
    min_arms: usize,
}

/// One match statement ready for handler extraction.
struct DispatchPlan {
    /// Line range of the whole match statement.
    lines: (usize, usize),
    scrutinee: String,
    /// Rewritten arm text plus the handler it calls (None keeps the arm).
    arms: Vec<ArmPlan>,
    has_semi: bool,
    /// Line after which the handlers are inserted.
    insert_after: usize,
}

struct ArmPlan {
    pattern: String,
    /// Handler name and body text; inline arms carry neither.
    handler: Option<(String, String)>,
    /// Original body text for arms kept inline.
    inline_body: String,
}

impl ReplaceConditional {
    pub fn new(config: &ReforgeConfig) -> Self {
        Self {
            min_arms: config.thresholds.min_match_arms,
        }
    }

    /// Dispatch plans for every qualifying match in top-level functions,
    /// optionally restricted to one function name.
    fn plans_for(&self, unit: &CompilationUnit, target: Option<&str>) -> Vec<DispatchPlan> {
        let Some(file) = unit.ast() else {
            return Vec::new();
        };
        let mut plans = Vec::new();
        for item in &file.items {
            let Item::Fn(function) = item else {
                continue;
            };
            let fn_name = function.sig.ident.to_string();
            if target.is_some_and(|t| t != fn_name) {
                continue;
            }
            let locals = local_names(function);
            let (_, fn_end) = node_lines(function);
            for stmt in &function.block.stmts {
                let (expr, semi) = match stmt {
                    Stmt::Expr(expr, semi) => (expr, semi.is_some()),
                    _ => continue,
                };
                let Expr::Match(expr_match) = expr else {
                    continue;
                };
                if let Some(plan) =
                    self.plan_match(&fn_name, stmt, expr_match, semi, &locals, fn_end)
                {
                    plans.push(plan);
                }
            }
        }
        plans
    }

    fn plan_match(
        &self,
        fn_name: &str,
        stmt: &Stmt,
        expr_match: &syn::ExprMatch,
        has_semi: bool,
        locals: &BTreeSet<String>,
        fn_end: usize,
    ) -> Option<DispatchPlan> {
        let mut used_names = BTreeSet::new();
        let mut arms = Vec::new();
        let mut dispatching = 0usize;
        for arm in &expr_match.arms {
            if arm.guard.is_some() {
                return None;
            }
            let pattern = render_tokens(&arm.pat);
            if is_dispatch_pattern(&arm.pat) {
                // Extracted bodies must stand alone.
                if reads_any_local(&arm.body, locals) {
                    return None;
                }
                let label = pattern_label(&arm.pat);
                let mut handler = format!("{fn_name}_{label}");
                let mut n = 2;
                while !used_names.insert(handler.clone()) {
                    handler = format!("{fn_name}_{label}{n}");
                    n += 1;
                }
                arms.push(ArmPlan {
                    pattern,
                    handler: Some((handler, body_statements(&arm.body))),
                    inline_body: String::new(),
                });
                dispatching += 1;
            } else if matches!(arm.pat, Pat::Wild(_)) {
                arms.push(ArmPlan {
                    pattern,
                    handler: None,
                    inline_body: render_tokens(&arm.body),
                });
            } else {
                return None;
            }
        }
        if dispatching < self.min_arms {
            return None;
        }
        Some(DispatchPlan {
            lines: node_lines(stmt),
            scrutinee: render_tokens(&expr_match.expr),
            arms,
            has_semi,
            insert_after: fn_end,
        })
    }

    fn rewrite(&self, unit: &CompilationUnit, target: Option<&str>) -> Option<String> {
        let plans = self.plans_for(unit, target);
        if plans.is_empty() {
            return None;
        }
        let mut edits = Vec::new();
        for plan in &plans {
            let indent = indent_of_line(unit.source(), plan.lines.0);
            let mut match_text = format!("{indent}match {} {{\n", plan.scrutinee);
            let mut handlers = String::new();
            for arm in &plan.arms {
                match &arm.handler {
                    Some((name, body)) => {
                        match_text.push_str(&format!("{indent}    {} => {name}(),\n", arm.pattern));
                        handlers.push_str(&format!("\nfn {name}() {{\n    {body}\n}}\n"));
                    }
                    None => {
                        match_text.push_str(&format!(
                            "{indent}    {} => {},\n",
                            arm.pattern, arm.inline_body
                        ));
                    }
                }
            }
            match_text.push_str(&format!("{indent}}}{}\n", if plan.has_semi { ";" } else { "" }));
            debug!(
                "replacing {}-arm dispatch at lines {}..{}",
                plan.arms.len(),
                plan.lines.0,
                plan.lines.1
            );
            edits.push(Edit::Replace {
                start: plan.lines.0,
                end: plan.lines.1,
                text: match_text,
            });
            edits.push(Edit::InsertAfter {
                line: plan.insert_after,
                text: handlers,
            });
        }
        Some(apply_edits(unit.source(), edits))
    }
}

/// A pattern that names a variant or constant and binds nothing.
fn is_dispatch_pattern(pat: &Pat) -> bool {
    matches!(pat, Pat::Path(_) | Pat::Lit(_))
}

fn pattern_label(pat: &Pat) -> String {
    let raw = match pat {
        Pat::Path(path) => path
            .path
            .segments
            .last()
            .map(|seg| seg.ident.to_string())
            .unwrap_or_default(),
        Pat::Lit(lit) => format!("case_{}", render_tokens(lit)),
        _ => String::new(),
    };
    let mut label = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_alphanumeric() {
            label.extend(c.to_lowercase());
        } else if !label.ends_with('_') {
            label.push('_');
        }
    }
    label.trim_matches('_').to_string()
}

/// Arm body as handler statements: blocks lose their braces, bare
/// expressions gain a terminating semicolon.
fn body_statements(body: &Expr) -> String {
    match body {
        Expr::Block(block) => {
            let stmts: Vec<String> = block.block.stmts.iter().map(render_tokens).collect();
            stmts.join(" ")
        }
        other => format!("{};", render_tokens(other)),
    }
}

fn render_tokens<T: ToTokens>(node: &T) -> String {
    crate::cohesion::normalize_tokens(&node.to_token_stream().to_string())
}

/// Parameter and let-bound names of a function.
fn local_names(function: &syn::ItemFn) -> BTreeSet<String> {
    #[derive(Default)]
    struct Binder {
        names: BTreeSet<String>,
    }
    impl<'ast> Visit<'ast> for Binder {
        fn visit_pat_ident(&mut self, pat: &'ast syn::PatIdent) {
            self.names.insert(pat.ident.to_string());
            syn::visit::visit_pat_ident(self, pat);
        }
    }
    let mut binder = Binder::default();
    for input in &function.sig.inputs {
        binder.visit_fn_arg(input);
    }
    for stmt in &function.block.stmts {
        if let Stmt::Local(local) = stmt {
            binder.visit_pat(&local.pat);
        }
    }
    binder.names
}

/// Does `body` mention any of `locals` as a value? Bare callee names are
/// function references, not locals.
fn reads_any_local(body: &Expr, locals: &BTreeSet<String>) -> bool {
    struct LocalUse<'a> {
        locals: &'a BTreeSet<String>,
        found: bool,
    }
    impl<'a, 'ast> Visit<'ast> for LocalUse<'a> {
        fn visit_expr(&mut self, expr: &'ast Expr) {
            if let Expr::Call(call) = expr {
                if matches!(call.func.as_ref(), Expr::Path(p) if p.path.get_ident().is_some()) {
                    for arg in &call.args {
                        self.visit_expr(arg);
                    }
                    return;
                }
            }
            if let Expr::Path(path) = expr {
                if let Some(ident) = path.path.get_ident() {
                    if self.locals.contains(&ident.to_string()) {
                        self.found = true;
                    }
                }
            }
            syn::visit::visit_expr(self, expr);
        }
    }
    let mut visitor = LocalUse {
        locals,
        found: false,
    };
    visitor.visit_expr(body);
    visitor.found
}

impl RefactoringStrategy for ReplaceConditional {
    fn name(&self) -> &'static str {
        "replace-conditional"
    }

    fn refactoring_type(&self) -> RefactoringType {
        RefactoringType::ReplaceConditional
    }

    fn addresses(&self) -> &'static [SmellType] {
        &[SmellType::SwitchOnType]
    }

    fn can_apply(&self, unit: &CompilationUnit) -> bool {
        !self.plans_for(unit, None).is_empty()
    }

    fn apply(&self, snapshot: &ProgramSnapshot, unit_path: &Path) -> Result<ProgramSnapshot> {
        let Some(unit) = snapshot.unit(unit_path) else {
            return unchanged(snapshot);
        };
        match self.rewrite(unit, None) {
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
        match self.rewrite(unit, Some(&smell.target_name)) {
            Some(source) => Ok(replace_unit_source(snapshot, unit_path, source)),
            None => unchanged(snapshot),
        }
    }

    fn estimate(&self, unit: &CompilationUnit, smell: Option<&CodeSmell>) -> RefactoringEstimate {
        let plans = self.plans_for(unit, smell.map(|s| s.target_name.as_str()));
        if plans.is_empty() {
            return RefactoringEstimate::rejected("no extractable dispatch found");
        }
        let handlers: Vec<String> = plans
            .iter()
            .flat_map(|p| p.arms.iter())
            .filter_map(|arm| arm.handler.as_ref().map(|(name, _)| name.clone()))
            .collect();
        RefactoringEstimate {
            can_apply: true,
            reason: None,
            complexity_reduction: handlers.len() as u32,
            cohesion_improvement: 0.0,
            new_class_count: 0,
            proposed_names: handlers,
        }
    }

    fn proposed_changes(&self, unit: &CompilationUnit, smell: &CodeSmell) -> ProposedChanges {
        let plans = self.plans_for(unit, Some(&smell.target_name));
        ProposedChanges {
            extracted_classes: Vec::new(),
            extracted_interfaces: Vec::new(),
            moved_members: plans
                .iter()
                .flat_map(|p| p.arms.iter())
                .filter_map(|arm| arm.handler.as_ref().map(|(name, _)| name.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const DISPATCH: &str = indoc! {"
        fn dispatch(cmd: Command) {
            let label = tag();
            match cmd {
                Command::Start => start_engine(),
                Command::Stop => {
                    stop_engine();
                    drain();
                }
                Command::Pause => pause_engine(),
                _ => log_unknown(label),
            }
        }
    "};

    fn snapshot_of(source: &str) -> ProgramSnapshot {
        ProgramSnapshot::from_units(vec![CompilationUnit::parse("dispatch.rs", source)])
    }

    #[test]
    fn arm_bodies_become_handlers() {
        let strategy = ReplaceConditional::new(&ReforgeConfig::default());
        let snapshot = snapshot_of(DISPATCH);
        assert!(strategy.can_apply(snapshot.unit("dispatch.rs".as_ref()).unwrap()));

        let result = strategy.apply(&snapshot, "dispatch.rs".as_ref()).unwrap();
        let unit = result.unit("dispatch.rs".as_ref()).unwrap();
        assert!(unit.is_valid(), "rewrite must stay parseable:\n{}", unit.source());

        let text = unit.source();
        assert!(text.contains("Command::Start => dispatch_start(),"));
        assert!(text.contains("Command::Stop => dispatch_stop(),"));
        assert!(text.contains("fn dispatch_start() {\n    start_engine();\n}"));
        assert!(text.contains("fn dispatch_stop() {\n    stop_engine(); drain();\n}"));
        // The wildcard arm reads a local and stays inline.
        assert!(text.contains("_ => log_unknown(label),"));
        assert!(!text.contains("fn dispatch_otherwise"));
    }

    #[test]
    fn local_reads_pin_the_match() {
        let strategy = ReplaceConditional::new(&ReforgeConfig::default());
        let source = indoc! {"
            fn route(kind: Kind) {
                let base = load();
                match kind {
                    Kind::A => apply(base),
                    Kind::B => reject(),
                    Kind::C => retry(),
                }
            }
        "};
        let snapshot = snapshot_of(source);
        let unit = snapshot.unit("dispatch.rs".as_ref()).unwrap();
        assert!(!strategy.can_apply(unit));
        let result = strategy.apply(&snapshot, "dispatch.rs".as_ref()).unwrap();
        assert_eq!(result.unit("dispatch.rs".as_ref()).unwrap().source(), source);
    }

    #[test]
    fn too_few_arms_are_ignored() {
        let strategy = ReplaceConditional::new(&ReforgeConfig::default());
        let source = indoc! {"
            fn tiny(kind: Kind) {
                match kind {
                    Kind::A => go(),
                    Kind::B => halt(),
                }
            }
        "};
        let snapshot = snapshot_of(source);
        assert!(!strategy.can_apply(snapshot.unit("dispatch.rs".as_ref()).unwrap()));
    }

    #[test]
    fn binding_patterns_disqualify_the_match() {
        let strategy = ReplaceConditional::new(&ReforgeConfig::default());
        let source = indoc! {"
            fn open(kind: Kind) {
                match kind {
                    Kind::File(path) => read(path),
                    Kind::Net => poll(),
                    Kind::Pipe => drain(),
                }
            }
        "};
        let snapshot = snapshot_of(source);
        assert!(!strategy.can_apply(snapshot.unit("dispatch.rs".as_ref()).unwrap()));
    }

    #[test]
    fn targeted_apply_only_touches_the_named_function() {
        let strategy = ReplaceConditional::new(&ReforgeConfig::default());
        let two = format!("{DISPATCH}\nfn untouched(cmd: Command) {{\n    match cmd {{\n        Command::Start => a(),\n        Command::Stop => b(),\n        Command::Pause => c(),\n    }}\n}}\n");
        let snapshot = snapshot_of(&two);
        let smell = CodeSmell {
            smell_type: SmellType::SwitchOnType,
            severity: crate::core::Severity::Medium,
            file: "dispatch.rs".into(),
            start_line: 1,
            end_line: 12,
            target_name: "dispatch".to_string(),
            description: String::new(),
        };
        let result = strategy
            .apply_targeted(&snapshot, "dispatch.rs".as_ref(), &smell)
            .unwrap();
        let text = result.unit("dispatch.rs".as_ref()).unwrap().source().to_string();
        assert!(text.contains("dispatch_start()"));
        assert!(text.contains("Command::Start => a(),"));
        assert!(!text.contains("untouched_start"));
    }
}
