//! Guard-clause introduction and redundant-else removal.
//!
//! Two rewrites, both at method level:
//!
//! 1. A method whose first statement is an `if` with no `else` wrapping most
//!    of the body gets the condition inverted into a guard clause with an
//!    early exit, and the wrapped body hoisted to the top level.
//! 2. An `else` branch whose preceding `if` branch provably exits (ends in
//!    `return`) is flattened into the enclosing block.
//!
//! Operator inversion is symmetric (`==`/`!=`, `<`/`>=`, `>`/`<=`); anything
//! else is wrapped in a negation. The early exit is chosen from the declared
//! return type; methods returning a value that cannot be defaulted safely
//! are left alone.

use super::{
    unchanged, replace_unit_source, ProposedChanges, RefactoringEstimate, RefactoringStrategy,
};
use crate::config::ReforgeConfig;
use crate::core::source::{
    apply_edits, dedent, extract_lines, indent, indent_of_line, node_lines, Edit,
};
use crate::core::{CodeSmell, CompilationUnit, ProgramSnapshot, RefactoringType, SmellType};
use anyhow::Result;
use quote::ToTokens;
use std::path::Path;
use syn::{Block, Expr, ReturnType, Stmt};

pub struct SimplifyMethod {
    guard_body_fraction: f64,
}

impl SimplifyMethod {
    pub fn new(config: &ReforgeConfig) -> Self {
        Self {
            guard_body_fraction: config.thresholds.guard_body_fraction,
        }
    }

    fn rewrites_for(&self, unit: &CompilationUnit, target: Option<&str>) -> Vec<Edit> {
        let Some(file) = unit.ast() else {
            return Vec::new();
        };
        let mut edits = Vec::new();
        for function in functions_of(&file) {
            if let Some(target) = target {
                if !target_matches(target, &function.name) {
                    continue;
                }
            }
            if let Some(edit) = self.guard_clause_edit(unit, &function) {
                edits.push(edit);
            } else {
                edits.extend(redundant_else_edits(unit, function.block));
            }
        }
        edits
    }

    /// Build the guard-clause rewrite for one function, if it qualifies.
    fn guard_clause_edit(&self, unit: &CompilationUnit, function: &FunctionRef) -> Option<Edit> {
        let block = function.block;
        let first = block.stmts.first()?;
        let Stmt::Expr(Expr::If(expr_if), _) = first else {
            return None;
        };
        if expr_if.else_branch.is_some() {
            return None;
        }

        let (_, block_end) = node_lines(block);
        let (if_start, if_end) = node_lines(expr_if);
        let (then_start, then_end) = node_lines(&expr_if.then_branch);
        // Header and braces must sit on their own lines for a line splice.
        if then_start == then_end || if_start != then_start && if_start + 1 != then_start {
            return None;
        }

        let wrapped = expr_if.then_branch.stmts.len();
        let trailing = block.stmts.len() - 1;
        if wrapped == 0
            || (wrapped as f64) < self.guard_body_fraction * (wrapped + trailing) as f64
        {
            return None;
        }

        let exit = early_exit(&function.output)?;
        let indent_text = indent_of_line(unit.source(), if_start);
        let inverted = render_condition(&invert_condition(&expr_if.cond));

        let mut replacement = format!("{indent_text}if {inverted} {{\n{indent_text}    {exit}\n{indent_text}}}\n");
        let hoisted = dedent(&extract_lines(unit.source(), then_start + 1, then_end - 1));
        replacement.push_str(&indent(&hoisted, &indent_text));
        if if_end < block_end - 1 {
            replacement.push_str(&extract_lines(unit.source(), if_end + 1, block_end - 1));
        }

        Some(Edit::Replace {
            start: if_start,
            end: block_end - 1,
            text: replacement,
        })
    }
}

impl RefactoringStrategy for SimplifyMethod {
    fn name(&self) -> &'static str {
        "simplify-method"
    }

    fn refactoring_type(&self) -> RefactoringType {
        RefactoringType::SimplifyMethod
    }

    fn addresses(&self) -> &'static [SmellType] {
        &[SmellType::LongMethod, SmellType::DeepNesting]
    }

    fn can_apply(&self, unit: &CompilationUnit) -> bool {
        !self.rewrites_for(unit, None).is_empty()
    }

    fn apply(&self, snapshot: &ProgramSnapshot, unit_path: &Path) -> Result<ProgramSnapshot> {
        let Some(unit) = snapshot.unit(unit_path) else {
            return unchanged(snapshot);
        };
        let edits = self.rewrites_for(unit, None);
        if edits.is_empty() {
            return unchanged(snapshot);
        }
        let source = apply_edits(unit.source(), edits);
        Ok(replace_unit_source(snapshot, unit_path, source))
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
        let edits = self.rewrites_for(unit, Some(&smell.target_name));
        if edits.is_empty() {
            return unchanged(snapshot);
        }
        let source = apply_edits(unit.source(), edits);
        Ok(replace_unit_source(snapshot, unit_path, source))
    }

    fn estimate(&self, unit: &CompilationUnit, smell: Option<&CodeSmell>) -> RefactoringEstimate {
        let target = smell.map(|s| s.target_name.as_str());
        let rewrites = self.rewrites_for(unit, target);
        if rewrites.is_empty() {
            return RefactoringEstimate::rejected("no guard-clause or redundant-else candidates");
        }
        RefactoringEstimate {
            can_apply: true,
            reason: None,
            // One nesting level disappears per rewrite.
            complexity_reduction: rewrites.len() as u32,
            cohesion_improvement: 0.0,
            new_class_count: 0,
            proposed_names: Vec::new(),
        }
    }

    fn proposed_changes(&self, unit: &CompilationUnit, smell: &CodeSmell) -> ProposedChanges {
        let rewrites = self.rewrites_for(unit, Some(&smell.target_name));
        ProposedChanges {
            moved_members: if rewrites.is_empty() {
                Vec::new()
            } else {
                vec![smell.target_name.clone()]
            },
            ..ProposedChanges::default()
        }
    }
}

struct FunctionRef<'ast> {
    name: String,
    output: ReturnType,
    block: &'ast Block,
}

fn functions_of(file: &syn::File) -> Vec<FunctionRef<'_>> {
    let mut out = Vec::new();
    for item in &file.items {
        match item {
            syn::Item::Fn(f) => out.push(FunctionRef {
                name: f.sig.ident.to_string(),
                output: f.sig.output.clone(),
                block: &f.block,
            }),
            syn::Item::Impl(i) if i.trait_.is_none() => {
                for impl_item in &i.items {
                    if let syn::ImplItem::Fn(m) = impl_item {
                        out.push(FunctionRef {
                            name: m.sig.ident.to_string(),
                            output: m.sig.output.clone(),
                            block: &m.block,
                        });
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn target_matches(target: &str, name: &str) -> bool {
    target == name || target.rsplit("::").next() == Some(name)
}

/// Early exit statement for a declared return type, or `None` when no safe
/// exit value exists.
fn early_exit(output: &ReturnType) -> Option<String> {
    match output {
        ReturnType::Default => Some("return;".to_string()),
        ReturnType::Type(_, ty) => {
            let rendered = ty.to_token_stream().to_string();
            let head = rendered.split(['<', ' ']).next().unwrap_or("");
            match head {
                "Option" => Some("return None;".to_string()),
                "()" => Some("return;".to_string()),
                _ => None,
            }
        }
    }
}

/// Invert a boolean condition with symmetric operator inversion, falling
/// back to wrapping in `!(..)`.
fn invert_condition(cond: &Expr) -> Expr {
    match cond {
        Expr::Unary(unary) if matches!(unary.op, syn::UnOp::Not(_)) => (*unary.expr).clone(),
        Expr::Paren(paren) => invert_condition(&paren.expr),
        Expr::Binary(binary) => {
            let inverted_op = match binary.op {
                syn::BinOp::Eq(_) => Some(quote::quote!(!=)),
                syn::BinOp::Ne(_) => Some(quote::quote!(==)),
                syn::BinOp::Lt(_) => Some(quote::quote!(>=)),
                syn::BinOp::Le(_) => Some(quote::quote!(>)),
                syn::BinOp::Gt(_) => Some(quote::quote!(<=)),
                syn::BinOp::Ge(_) => Some(quote::quote!(<)),
                _ => None,
            };
            match inverted_op {
                Some(op) => {
                    let left = &binary.left;
                    let right = &binary.right;
                    syn::parse_quote!(#left #op #right)
                }
                None => negate(cond),
            }
        }
        other => negate(other),
    }
}

fn negate(cond: &Expr) -> Expr {
    syn::parse_quote!(!(#cond))
}

fn render_condition(cond: &Expr) -> String {
    cond.to_token_stream()
        .to_string()
        .replace(" . ", ".")
        .replace(" ,", ",")
        .replace("! ", "!")
        .replace("( ", "(")
        .replace(" )", ")")
}

/// Flatten `else` branches whose `if` branch ends in `return`.
fn redundant_else_edits(unit: &CompilationUnit, block: &Block) -> Vec<Edit> {
    let mut edits = Vec::new();
    for stmt in &block.stmts {
        let Stmt::Expr(Expr::If(expr_if), _) = stmt else {
            continue;
        };
        let Some((_, else_expr)) = &expr_if.else_branch else {
            continue;
        };
        let Expr::Block(else_block) = else_expr.as_ref() else {
            continue;
        };
        if !branch_exits(&expr_if.then_branch) {
            continue;
        }
        let (else_start, else_end) = node_lines(&else_block.block);
        if else_end <= else_start + 1 {
            continue;
        }
        let indent_text = indent_of_line(unit.source(), else_start);
        let body = dedent(&extract_lines(unit.source(), else_start + 1, else_end - 1));
        let mut text = format!("{indent_text}}}\n");
        text.push_str(&indent(&body, &indent_text));
        edits.push(Edit::Replace {
            start: else_start,
            end: else_end,
            text,
        });
    }
    edits
}

fn branch_exits(block: &Block) -> bool {
    matches!(
        block.stmts.last(),
        Some(Stmt::Expr(Expr::Return(_), _))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn strategy() -> SimplifyMethod {
        SimplifyMethod::new(&ReforgeConfig::default())
    }

    fn snapshot_of(source: &str) -> ProgramSnapshot {
        ProgramSnapshot::from_units([CompilationUnit::parse("m.rs", source)])
    }

    #[test]
    fn wraps_dominant_if_into_guard_clause() {
        let source = indoc! {"
            fn run() {
                if ready {
                    step_one();
                    step_two();
                    step_three();
                    step_four();
                }
            }
        "};
        let snapshot = snapshot_of(source);
        let strategy = strategy();
        let unit = snapshot.unit(Path::new("m.rs")).unwrap();
        assert!(strategy.can_apply(unit));

        let result = strategy.apply(&snapshot, Path::new("m.rs")).unwrap();
        let transformed = result.unit(Path::new("m.rs")).unwrap();
        assert!(transformed.is_valid());
        assert_eq!(
            transformed.source(),
            indoc! {"
                fn run() {
                    if !ready {
                        return;
                    }
                    step_one();
                    step_two();
                    step_three();
                    step_four();
                }
            "}
        );
    }

    #[test]
    fn negated_condition_is_unwrapped_not_double_negated() {
        let source = indoc! {"
            fn run() {
                if !ready {
                    step_one();
                    step_two();
                    step_three();
                    step_four();
                }
            }
        "};
        let snapshot = snapshot_of(source);
        let result = strategy().apply(&snapshot, Path::new("m.rs")).unwrap();
        let transformed = result.unit(Path::new("m.rs")).unwrap();
        assert!(transformed.is_valid());
        assert!(transformed.source().contains("if ready {"));
        assert!(!transformed.source().contains("!!"));
    }

    #[test]
    fn comparison_operators_invert_symmetrically() {
        let source = indoc! {"
            fn run(count: usize) {
                if count < limit {
                    step_one();
                    step_two();
                    step_three();
                    step_four();
                }
            }
        "};
        let snapshot = snapshot_of(source);
        let result = strategy().apply(&snapshot, Path::new("m.rs")).unwrap();
        let transformed = result.unit(Path::new("m.rs")).unwrap();
        assert!(transformed.source().contains("if count >= limit {"));
    }

    #[test]
    fn small_if_is_left_alone() {
        let source = indoc! {"
            fn run() {
                if ready {
                    step_one();
                }
                step_two();
                step_three();
                step_four();
                step_five();
            }
        "};
        let snapshot = snapshot_of(source);
        let strategy = strategy();
        let unit = snapshot.unit(Path::new("m.rs")).unwrap();
        assert!(!strategy.can_apply(unit));

        let result = strategy.apply(&snapshot, Path::new("m.rs")).unwrap();
        let transformed = result.unit(Path::new("m.rs")).unwrap();
        assert_eq!(transformed.source(), source);
    }

    #[test]
    fn else_after_return_is_flattened() {
        let source = indoc! {"
            fn pick(flag: bool) -> u32 {
                if flag {
                    return 1;
                } else {
                    fallback_one();
                    fallback_two();
                }
                0
            }
        "};
        let snapshot = snapshot_of(source);
        let result = strategy().apply(&snapshot, Path::new("m.rs")).unwrap();
        let transformed = result.unit(Path::new("m.rs")).unwrap();
        assert!(transformed.is_valid());
        assert!(!transformed.source().contains("else"));
        assert!(transformed.source().contains("fallback_one();"));
    }

    #[test]
    fn value_returning_method_without_safe_exit_is_skipped() {
        let source = indoc! {"
            fn compute() -> u32 {
                if ready {
                    step_one();
                    step_two();
                    step_three();
                    step_four();
                }
                7
            }
        "};
        let snapshot = snapshot_of(source);
        let unit = snapshot.unit(Path::new("m.rs")).unwrap();
        assert!(!strategy().can_apply(unit));
    }

    #[test]
    fn option_return_uses_none_exit() {
        let source = indoc! {"
            fn lookup() -> Option<u32> {
                if ready {
                    step_one();
                    step_two();
                    step_three();
                    return Some(1);
                }
                None
            }
        "};
        let snapshot = snapshot_of(source);
        let result = strategy().apply(&snapshot, Path::new("m.rs")).unwrap();
        let transformed = result.unit(Path::new("m.rs")).unwrap();
        assert!(transformed.is_valid());
        assert!(transformed.source().contains("return None;"));
    }

    #[test]
    fn targeted_apply_on_missing_function_is_a_noop() {
        let source = "fn run() {\n    step();\n}\n";
        let snapshot = snapshot_of(source);
        let smell = CodeSmell {
            smell_type: SmellType::LongMethod,
            severity: crate::core::Severity::Medium,
            file: "m.rs".into(),
            start_line: 1,
            end_line: 3,
            target_name: "absent".into(),
            description: String::new(),
        };
        let result = strategy()
            .apply_targeted(&snapshot, Path::new("m.rs"), &smell)
            .unwrap();
        assert_eq!(
            result.unit(Path::new("m.rs")).unwrap().source(),
            source
        );
    }
}
