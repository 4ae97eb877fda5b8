//! Shared helpers for parser tests

use pi_expr_ast::{Expression, Spanned};

/// Render a tree as a compact s-expression, e.g. `(+ 1 (* 2 3))`
pub fn sexpr(expr: &Spanned<Expression>) -> String {
    match &expr.inner {
        Expression::Literal(lit) => lit.to_string(),
        Expression::Group(inner) => format!("(group {})", sexpr(inner)),
        Expression::BinaryOp(bin) => {
            format!("({} {} {})", bin.op.symbol(), sexpr(&bin.left), sexpr(&bin.right))
        }
        Expression::UnaryOp(un) => format!("({} {})", un.op.symbol(), sexpr(&un.operand)),
        Expression::FunctionCall(call) => {
            let mut out = format!("({}", call.qualified_name());
            if call.distinct {
                out.push_str(" distinct");
            }
            for arg in &call.args {
                out.push(' ');
                out.push_str(&sexpr(arg));
            }
            out.push(')');
            out
        }
        Expression::Item(item) => item.to_string(),
        Expression::Variable(name) => format!("V{{{name}}}"),
    }
}
