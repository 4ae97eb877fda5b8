//! Expression error types

use crate::{ErrorCode, SourceLocation, Span};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kind of metadata object a reference points at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    DataElement,
    ProgramStage,
    Attribute,
    Constant,
    RelationshipType,
    /// Bracketed reference with an unsupported prefix, e.g. `D{...}`
    Unsupported(String),
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataElement => write!(f, "data element"),
            Self::ProgramStage => write!(f, "program stage"),
            Self::Attribute => write!(f, "tracked entity attribute"),
            Self::Constant => write!(f, "constant"),
            Self::RelationshipType => write!(f, "relationship type"),
            Self::Unsupported(prefix) => write!(f, "'{prefix}{{...}}'"),
        }
    }
}

/// Accepted argument count of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arity {
    pub min: usize,
    /// `None` for variadic functions
    pub max: Option<usize>,
}

impl Arity {
    pub const fn new(min: usize, max: Option<usize>) -> Self {
        Self { min, max }
    }

    pub const fn exactly(count: usize) -> Self {
        Self::new(count, Some(count))
    }

    pub const fn accepts(&self, count: usize) -> bool {
        match self.max {
            Some(max) => count >= self.min && count <= max,
            None => count >= self.min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{} to {max}", self.min),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// Main error type for parsing and compiling expressions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    /// Lexing or parsing failed
    #[error("{code}: {message} at {location}")]
    Syntax {
        code: ErrorCode,
        message: String,
        expression: String,
        location: SourceLocation,
    },

    /// A referenced metadata object does not exist
    #[error("{}: Unknown {kind} '{uid}'", ErrorCode::UnknownReference)]
    UnknownReference { kind: ReferenceKind, uid: String },

    #[error("{}: Unknown program variable 'V{{{name}}}'", ErrorCode::UnknownVariable)]
    UnknownVariable { name: String },

    /// Function is not registered
    #[error("{}: Illegal function '{name}'", ErrorCode::IllegalFunction)]
    IllegalFunction { name: String },

    #[error("{}: Function '{function}' expects {expected} argument(s), found {found}", ErrorCode::ArgumentCount)]
    ArgumentCount {
        function: String,
        expected: Arity,
        found: usize,
    },

    /// Argument has the wrong shape for the function
    #[error("{}: Invalid argument to '{function}': {message}", ErrorCode::InvalidArgument)]
    InvalidArgument { function: String, message: String },
}

impl ExpressionError {
    /// Create a syntax error located at `span` inside `expression`
    pub fn syntax(
        code: ErrorCode,
        message: impl Into<String>,
        expression: &str,
        span: Span,
    ) -> Self {
        Self::Syntax {
            code,
            message: message.into(),
            expression: expression.to_string(),
            location: SourceLocation::locate(expression, span),
        }
    }

    pub fn unknown_reference(kind: ReferenceKind, uid: impl Into<String>) -> Self {
        Self::UnknownReference {
            kind,
            uid: uid.into(),
        }
    }

    pub fn unknown_variable(name: impl Into<String>) -> Self {
        Self::UnknownVariable { name: name.into() }
    }

    pub fn illegal_function(name: impl Into<String>) -> Self {
        Self::IllegalFunction { name: name.into() }
    }

    pub fn argument_count(function: impl Into<String>, expected: Arity, found: usize) -> Self {
        Self::ArgumentCount {
            function: function.into(),
            expected,
            found,
        }
    }

    pub fn invalid_argument(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Syntax { code, .. } => *code,
            Self::UnknownReference { .. } => ErrorCode::UnknownReference,
            Self::IllegalFunction { .. } => ErrorCode::IllegalFunction,
            Self::UnknownVariable { .. } => ErrorCode::UnknownVariable,
            Self::ArgumentCount { .. } => ErrorCode::ArgumentCount,
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
        }
    }

    /// Get the location if available
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::Syntax { location, .. } => Some(location),
            _ => None,
        }
    }
}
