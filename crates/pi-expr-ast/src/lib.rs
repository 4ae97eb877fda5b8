//! Program indicator expression AST
//!
//! The tree produced by the parser and walked by every compilation mode. Nodes are
//! immutable once built and carry the byte span they were parsed from, which the
//! description mode relies on to splice display names into the original text.

mod expression;
mod literal;
mod operator;

pub use expression::*;
pub use literal::*;
pub use operator::*;

pub use pi_expr_diagnostics::Span;

/// A node tagged with the span it was parsed from
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub inner: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub const fn new(inner: T, span: Span) -> Self {
        Self { inner, span }
    }
}

impl<T> std::ops::Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

/// Type alias for boxed expressions
pub type BoxExpr = Box<Spanned<Expression>>;
