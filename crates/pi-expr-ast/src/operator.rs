//! Operators with precedence information

use serde::{Deserialize, Serialize};

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Precedence 1 (lowest)
    /// `||` or `or`
    Or,

    // Precedence 2
    /// `&&` or `and`
    And,

    // Precedence 3
    /// `==`
    Equal,
    /// `!=`
    NotEqual,

    // Precedence 4
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,

    // Precedence 5
    Add,
    Subtract,

    // Precedence 6
    Multiply,
    Divide,
    Modulo,

    // Precedence 7 (binds tighter than unary operators)
    Power,
}

impl BinaryOp {
    /// Get the precedence level (1-7, higher binds tighter)
    pub const fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Equal | Self::NotEqual => 3,
            Self::Less | Self::LessOrEqual | Self::Greater | Self::GreaterOrEqual => 4,
            Self::Add | Self::Subtract => 5,
            Self::Multiply | Self::Divide | Self::Modulo => 6,
            Self::Power => 7,
        }
    }

    pub const fn is_right_associative(&self) -> bool {
        matches!(self, Self::Power)
    }

    pub const fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::Less
                | Self::LessOrEqual
                | Self::Greater
                | Self::GreaterOrEqual
        )
    }

    pub const fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub const fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulo | Self::Power
        )
    }

    /// Canonical expression-language symbol
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Power => "^",
        }
    }

    /// PostgreSQL spelling of the operator
    pub const fn sql(&self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Equal => "=",
            other => other.symbol(),
        }
    }
}

/// Unary prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `!` or `not`
    Not,
    Plus,
    Negate,
}

impl UnaryOp {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Plus => "+",
            Self::Negate => "-",
        }
    }

    /// SQL prefix, including the separating space where one is needed
    pub const fn sql_prefix(&self) -> &'static str {
        match self {
            Self::Not => "not ",
            Self::Plus => "+",
            Self::Negate => "-",
        }
    }
}
