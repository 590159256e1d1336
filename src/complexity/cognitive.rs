//! Cognitive complexity: a nesting-weighted walk approximating how hard
//! control flow is to read.
//!
//! Every branching or looping construct costs `1 + nesting_level` and raises
//! the nesting level for its children. Chains of the same boolean operator
//! cost a flat 1 per run (`a && b && c` is one run, `a && b || c` is two).
//! Closures raise nesting without adding complexity themselves.

use syn::{visit::Visit, Block, Expr};

pub fn calculate_cognitive(block: &Block) -> u32 {
    let mut visitor = CognitiveVisitor {
        complexity: 0,
        nesting: 0,
        bool_chain: None,
    };
    visitor.visit_block(block);
    visitor.complexity
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BoolOp {
    And,
    Or,
}

struct CognitiveVisitor {
    complexity: u32,
    nesting: u32,
    bool_chain: Option<BoolOp>,
}

impl CognitiveVisitor {
    fn nested<F: FnOnce(&mut Self)>(&mut self, f: F) {
        self.nesting += 1;
        let saved = self.bool_chain.take();
        f(self);
        self.bool_chain = saved;
        self.nesting -= 1;
    }

    fn add_structural(&mut self) {
        self.complexity += 1 + self.nesting;
    }
}

impl<'ast> Visit<'ast> for CognitiveVisitor {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        match expr {
            Expr::If(expr_if) => {
                self.add_structural();
                self.visit_expr(&expr_if.cond);
                self.nested(|v| v.visit_block(&expr_if.then_branch));
                if let Some((_, else_expr)) = &expr_if.else_branch {
                    // `else if` re-enters this arm; a plain `else` block only
                    // nests, the construct itself was already charged.
                    match else_expr.as_ref() {
                        Expr::If(_) => self.visit_expr(else_expr),
                        other => self.nested(|v| v.visit_expr(other)),
                    }
                }
            }
            Expr::While(e) => {
                self.add_structural();
                self.visit_expr(&e.cond);
                self.nested(|v| v.visit_block(&e.body));
            }
            Expr::ForLoop(e) => {
                self.add_structural();
                self.visit_expr(&e.expr);
                self.nested(|v| v.visit_block(&e.body));
            }
            Expr::Loop(e) => {
                self.add_structural();
                self.nested(|v| v.visit_block(&e.body));
            }
            Expr::Match(e) => {
                self.add_structural();
                self.visit_expr(&e.expr);
                self.nested(|v| {
                    for arm in &e.arms {
                        v.visit_expr(&arm.body);
                    }
                });
            }
            Expr::Closure(e) => {
                self.nested(|v| v.visit_expr(&e.body));
            }
            Expr::Binary(b) if is_logical(&b.op) => {
                let op = if matches!(b.op, syn::BinOp::And(_)) {
                    BoolOp::And
                } else {
                    BoolOp::Or
                };
                if self.bool_chain != Some(op) {
                    self.complexity += 1;
                }
                let saved = self.bool_chain;
                self.bool_chain = Some(op);
                self.visit_expr(&b.left);
                self.visit_expr(&b.right);
                self.bool_chain = saved;
            }
            other => {
                let saved = self.bool_chain.take();
                syn::visit::visit_expr(self, other);
                self.bool_chain = saved;
            }
        }
    }
}

fn is_logical(op: &syn::BinOp) -> bool {
    matches!(op, syn::BinOp::And(_) | syn::BinOp::Or(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_of(body: &str) -> Block {
        let f: syn::ItemFn = syn::parse_str(&format!("fn t() {{ {body} }}")).unwrap();
        *f.block
    }

    #[test]
    fn flat_sequence_costs_nothing() {
        let block = block_of("let x = 1; let y = 2; let z = x + y;");
        assert_eq!(calculate_cognitive(&block), 0);
    }

    #[test]
    fn nesting_raises_the_increment() {
        // if (+1) containing while (+2) containing if (+3)
        let block = block_of("if a { while b { if c { work(); } } }");
        assert_eq!(calculate_cognitive(&block), 6);
    }

    #[test]
    fn same_operator_chain_is_one_run() {
        let block = block_of("if a && b && c { }");
        assert_eq!(calculate_cognitive(&block), 2);
    }

    #[test]
    fn mixed_operators_count_per_run() {
        let block = block_of("if a && b || c { }");
        assert_eq!(calculate_cognitive(&block), 3);
    }

    #[test]
    fn closures_nest_without_adding() {
        let block = block_of("let f = || { if a { work(); } };");
        // closure adds 0 but nests: inner if costs 2
        assert_eq!(calculate_cognitive(&block), 2);
    }
}
