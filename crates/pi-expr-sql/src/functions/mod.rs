//! Function library for program indicator expressions
//!
//! This module provides the registry that maps function names (`d2:zing`, `avg`, `if`)
//! to their definitions, and the argument model the visitor prepares before an emitter
//! runs.

mod builtin;
mod d2;

use crate::context::CompilationContext;
use crate::items::ResolvedItem;
use once_cell::sync::Lazy;
use pi_expr_diagnostics::{Arity, ExpressionError, Result, Span};
use pi_expr_model::DataType;
use regex::Regex;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

/// How an argument is prepared before the emitter sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Compiled expression, items wrapped for missing values
    Value,
    /// Compiled expression; a direct item or variable is passed unwrapped
    RawValue,
    /// Program stage data element or event date reference
    Item,
    /// Boolean expression, either direct or as the text of a string literal
    Condition,
    /// String literal `"<op> <expr>"`
    Comparison,
    /// String literal passed verbatim
    Text,
    /// String literal naming a relationship type uid
    RelationshipType,
}

/// Result type of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    Fixed(DataType),
    /// Same type as the argument at this index
    SameAs(usize),
}

/// Comparison operator accepted in comparison strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

/// Allow-list of operators a comparison string may start with
static COMPARISON_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(==|!=|>=|<=|=|>|<)\s*").expect("comparison pattern is valid"));

impl ComparisonOp {
    /// Split a leading operator off `text`, returning it with the byte offset of the operand
    pub fn split(text: &str) -> Option<(Self, usize)> {
        let captures = COMPARISON_PREFIX.captures(text)?;
        let op = match captures.get(1)?.as_str() {
            "==" | "=" => Self::Equal,
            "!=" => Self::NotEqual,
            ">=" => Self::GreaterOrEqual,
            "<=" => Self::LessOrEqual,
            ">" => Self::Greater,
            "<" => Self::Less,
            _ => return None,
        };
        Some((op, captures.get(0)?.end()))
    }

    pub const fn sql(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

/// A prepared argument carrying the mode's output
#[derive(Debug, Clone, PartialEq)]
pub enum Arg<O> {
    Value(O),
    Item { item: ResolvedItem, value: O },
    Comparison { op: ComparisonOp, operand: O },
    /// Literal text; `span` covers the text between the quotes
    Text {
        value: String,
        span: Span,
        display: Option<String>,
    },
}

impl<O> Arg<O> {
    /// Compiled output of the argument, if it has one
    pub fn output(&self) -> Option<&O> {
        match self {
            Self::Value(value) | Self::Item { value, .. } => Some(value),
            Self::Comparison { operand, .. } => Some(operand),
            Self::Text { .. } => None,
        }
    }

    pub fn item(&self) -> Option<&ResolvedItem> {
        match self {
            Self::Item { item, .. } => Some(item),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// A function call with its arguments prepared
#[derive(Debug, Clone)]
pub struct Call<'c, O> {
    pub name: &'c str,
    pub distinct: bool,
    pub args: SmallVec<[Arg<O>; 4]>,
    pub span: Span,
}

impl<O> Call<'_, O> {
    /// Compiled output of argument `index`
    pub fn value(&self, index: usize) -> Result<&O> {
        self.args
            .get(index)
            .and_then(Arg::output)
            .ok_or_else(|| self.invalid(format!("argument {} has no value", index + 1)))
    }

    /// Item and its compiled value at argument `index`
    pub fn item(&self, index: usize) -> Result<(&ResolvedItem, &O)> {
        match self.args.get(index) {
            Some(Arg::Item { item, value }) => Ok((item, value)),
            _ => Err(self.invalid(format!("argument {} must be an item", index + 1))),
        }
    }

    pub fn values(&self) -> impl Iterator<Item = &O> {
        self.args.iter().filter_map(Arg::output)
    }

    pub fn invalid(&self, message: impl Into<String>) -> ExpressionError {
        ExpressionError::invalid_argument(self.name, message)
    }
}

pub type SqlEmitter = fn(&CompilationContext<'_>, &Call<'_, String>) -> Result<String>;

/// Produces description replacements beyond the ones for items, constants and variables
pub type DescribeEmitter = fn(&Call<'_, ()>) -> Vec<(Span, String)>;

/// A registered function
#[derive(Debug, Clone)]
pub struct FunctionDef {
    /// Qualified name, e.g. `d2:zing`
    pub name: &'static str,
    pub arity: Arity,
    /// Parameter kinds; the last one repeats for variadic functions
    pub params: &'static [ArgKind],
    pub returns: ReturnType,
    /// Aggregates accept a leading `distinct`
    pub aggregate: bool,
    pub sql: SqlEmitter,
    pub describe: Option<DescribeEmitter>,
}

impl FunctionDef {
    pub const fn new(
        name: &'static str,
        arity: Arity,
        params: &'static [ArgKind],
        returns: ReturnType,
        sql: SqlEmitter,
    ) -> Self {
        Self {
            name,
            arity,
            params,
            returns,
            aggregate: false,
            sql,
            describe: None,
        }
    }

    pub const fn aggregate(mut self) -> Self {
        self.aggregate = true;
        self
    }

    pub const fn with_describe(mut self, describe: DescribeEmitter) -> Self {
        self.describe = Some(describe);
        self
    }

    /// Kind of the argument at `index`
    pub fn arg_kind(&self, index: usize) -> ArgKind {
        self.params
            .get(index)
            .or_else(|| self.params.last())
            .copied()
            .unwrap_or(ArgKind::Value)
    }
}

/// Registry of functions by qualified name
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<&'static str, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the `d2:` functions and the built-ins registered
    pub fn with_standard_functions() -> Self {
        let mut registry = Self::new();
        registry.register_standard_functions();
        registry
    }

    pub fn register_standard_functions(&mut self) {
        d2::register(self);
        builtin::register(self);
    }

    /// Register a function, replacing any previous one with the same name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
