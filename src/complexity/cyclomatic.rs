use syn::{visit::Visit, Block, Expr};

/// Cyclomatic complexity of one code block: 1 + branching constructs.
///
/// Counts `if`, loops, `match` arms, `?`, and short-circuit boolean
/// operators as independent decision points.
pub fn calculate_cyclomatic(block: &Block) -> u32 {
    let mut visitor = CyclomaticVisitor { complexity: 1 };
    visitor.visit_block(block);
    visitor.complexity
}

struct CyclomaticVisitor {
    complexity: u32,
}

fn expr_complexity(expr: &Expr) -> u32 {
    match expr {
        Expr::If(_) | Expr::While(_) | Expr::ForLoop(_) | Expr::Loop(_) | Expr::Try(_) => 1,
        Expr::Match(expr_match) => expr_match.arms.len() as u32,
        Expr::Binary(binary) if is_logical_operator(&binary.op) => 1,
        _ => 0,
    }
}

impl<'ast> Visit<'ast> for CyclomaticVisitor {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        self.complexity += expr_complexity(expr);
        syn::visit::visit_expr(self, expr);
    }
}

fn is_logical_operator(op: &syn::BinOp) -> bool {
    matches!(op, syn::BinOp::And(_) | syn::BinOp::Or(_))
}
