//! Program indicator expression diagnostics
//!
//! This crate provides the error handling infrastructure shared by the parser and the
//! SQL compiler: structured error codes, source locations and the error taxonomy.

mod error;
mod error_code;
mod span;

pub use error::*;
pub use error_code::*;
pub use span::*;

/// Result type for expression operations
pub type Result<T> = std::result::Result<T, ExpressionError>;
