//! Literal AST nodes

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Numeric literal, scale preserved as written (`3.50` stays `3.50`)
    Number(Decimal),
    /// String literal with escapes already resolved
    String(String),
    Boolean(bool),
}

impl Literal {
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// The string payload, if this is a string literal
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Decimal> for Literal {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "'{s}'"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}
