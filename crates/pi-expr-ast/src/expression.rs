//! Expression AST nodes

use crate::{BinaryOp, BoxExpr, Literal, Spanned, UnaryOp};
use std::fmt;

/// All expression kinds of the program indicator language
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Number, string or boolean literal
    Literal(Literal),
    /// Explicit parentheses, kept so emitted SQL preserves the author's grouping
    Group(BoxExpr),
    BinaryOp(BinaryOpExpr),
    UnaryOp(UnaryOpExpr),
    /// `d2:name(args)`, `name(args)` or `name(distinct arg)`
    FunctionCall(FunctionCall),
    /// Bracketed metadata reference
    Item(ItemRef),
    /// `V{name}`; the name is validated at compile time
    Variable(String),
}

impl Expression {
    /// Whether the node references a column directly (item or program variable)
    pub const fn is_reference(&self) -> bool {
        matches!(self, Self::Item(_) | Self::Variable(_))
    }

    /// String payload of a string literal node
    pub fn as_string_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(lit) => lit.as_str(),
            _ => None,
        }
    }
}

/// Binary operation
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOpExpr {
    pub left: BoxExpr,
    pub op: BinaryOp,
    pub right: BoxExpr,
}

/// Unary prefix operation
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryOpExpr {
    pub op: UnaryOp,
    pub operand: BoxExpr,
}

/// Function invocation
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// `d2` for `d2:` functions, `None` for built-ins and aggregates
    pub namespace: Option<String>,
    pub name: String,
    /// Set when the first argument was preceded by `distinct`
    pub distinct: bool,
    pub args: Vec<Spanned<Expression>>,
}

impl FunctionCall {
    /// Name as registered in the function library, e.g. `d2:zing` or `avg`
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}:{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Reference to a metadata object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemRef {
    /// `#{stageUid.elementUid}`
    DataElement { stage: String, element: String },
    /// `A{attributeUid}`
    Attribute { attribute: String },
    /// `C{constantUid}`
    Constant { constant: String },
    /// `PS_EVENTDATE:stageUid`
    EventDate { stage: String },
    /// Any other `X{...}` form
    Other { prefix: String, body: String },
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataElement { stage, element } => write!(f, "#{{{stage}.{element}}}"),
            Self::Attribute { attribute } => write!(f, "A{{{attribute}}}"),
            Self::Constant { constant } => write!(f, "C{{{constant}}}"),
            Self::EventDate { stage } => write!(f, "PS_EVENTDATE:{stage}"),
            Self::Other { prefix, body } => write!(f, "{prefix}{{{body}}}"),
        }
    }
}
