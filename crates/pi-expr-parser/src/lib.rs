//! Program indicator expression parser
//!
//! Expressions are tokenized with Winnow combinators and parsed by a recursive
//! descent parser with one function per precedence level. Function arity and
//! reference validity are not checked here; that happens during compilation.

mod expression;
mod lexer;

pub use lexer::{Token, TokenKind, tokenize};

use expression::{TokenParser, shift_spans};
use pi_expr_ast::{Expression, Spanned};
use pi_expr_diagnostics::Result;
use serde::{Deserialize, Serialize};

/// Default limit on tree depth: nested groups, unary operators, calls and the operators
/// of left-associative chains
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Parser configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum nesting depth before parsing is aborted
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParserConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Parse a token stream produced by [`tokenize`] from `source`
pub fn parse(source: &str, tokens: &[Token], config: &ParserConfig) -> Result<Spanned<Expression>> {
    TokenParser::new(source, tokens, config.max_depth).parse_root()
}

/// Tokenize and parse an expression with the default configuration
pub fn parse_expression(source: &str) -> Result<Spanned<Expression>> {
    parse_expression_with(source, &ParserConfig::default())
}

/// Tokenize and parse an expression
pub fn parse_expression_with(source: &str, config: &ParserConfig) -> Result<Spanned<Expression>> {
    let tokens = tokenize(source)?;
    log::trace!("tokenized {} token(s) from '{source}'", tokens.len());
    parse(source, &tokens, config)
}

/// Parse an expression embedded in another one, e.g. the text of a string argument.
///
/// Spans of the result are shifted by `base_offset` so they point into the enclosing
/// expression. Syntax errors are reported against `source` itself.
pub fn parse_at(source: &str, base_offset: usize, config: &ParserConfig) -> Result<Spanned<Expression>> {
    let expr = parse_expression_with(source, config)?;
    Ok(shift_spans(expr, base_offset))
}
