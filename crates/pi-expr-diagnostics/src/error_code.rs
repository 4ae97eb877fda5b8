//! Stable error codes
//!
//! Codes below 100 come from the lexer and parser. The rest are raised while compiling
//! against metadata.

use std::fmt;

/// Code carried by every [`ExpressionError`](crate::ExpressionError), shown as `PI0001`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    UnexpectedToken = 1,
    UnexpectedEnd = 2,
    /// Identifier that is neither a call nor a `#{}`, `A{}`, `C{}` or `V{}` reference
    BareIdentifier = 3,
    InvalidNumber = 4,
    UnterminatedString = 6,
    /// `(` or `{` never closed
    UnclosedDelimiter = 10,
    ExpectedOperand = 12,
    NestingTooDeep = 16,
    UnknownReference = 100,
    IllegalFunction = 101,
    UnknownVariable = 102,
    ArgumentCount = 111,
    InvalidArgument = 112,
}

impl ErrorCode {
    pub const fn number(self) -> u16 {
        self as u16
    }

    /// True when the expression was rejected before any metadata lookup
    pub const fn is_syntax(self) -> bool {
        self.number() < 100
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PI{:04}", self.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::UnexpectedToken.to_string(), "PI0001");
        assert_eq!(ErrorCode::NestingTooDeep.to_string(), "PI0016");
        assert_eq!(ErrorCode::ArgumentCount.to_string(), "PI0111");
    }

    #[test]
    fn test_syntax_codes() {
        assert!(ErrorCode::UnterminatedString.is_syntax());
        assert!(!ErrorCode::IllegalFunction.is_syntax());
    }
}
