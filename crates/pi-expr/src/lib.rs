//! Program indicator expressions for Rust
//!
//! This crate ties together the program indicator expression language:
//! - Parsing expressions such as `d2:daysBetween(V{enrollment_date}, #{ProgrmStagA.DataElmentD})`
//! - Resolving data elements, attributes, constants and relationship types through a
//!   [`MetadataProvider`](model::MetadataProvider)
//! - Compiling to the PostgreSQL fragment embedded in event or enrollment analytics queries
//! - Describing expressions with display names, and checking their validity
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use pi_expr::model::{DataElementInfo, InMemoryMetadata, ProgramStageInfo, ValueType};
//! use pi_expr::{AnalyticsType, CompilationRequest, ProgramIndicatorEngine};
//!
//! let metadata = InMemoryMetadata::new()
//!     .with_program_stage(ProgramStageInfo::new("ProgrmStagA", "Birth"))
//!     .with_data_element(DataElementInfo::new("DataElmentA", "Weight", ValueType::Number));
//! let engine = ProgramIndicatorEngine::new(metadata);
//!
//! let date = NaiveDate::from_ymd_opt(2020, 1, 9).unwrap();
//! let request = CompilationRequest::new(AnalyticsType::Event, "Program000A", date, date);
//!
//! let sql = engine.analytics_sql("#{ProgrmStagA.DataElmentA} / 1000", &request).unwrap();
//! assert_eq!(sql, "coalesce(\"DataElmentA\"::numeric,0) / 1000");
//!
//! let description = engine.description("#{ProgrmStagA.DataElmentA} / 1000", &request).unwrap();
//! assert_eq!(description, "Birth.Weight / 1000");
//! ```

// Re-export all public APIs from internal crates
pub use pi_expr_ast as ast;
pub use pi_expr_diagnostics as diagnostics;
pub use pi_expr_model as model;
pub use pi_expr_parser as parser;
pub use pi_expr_sql as sql;

// Convenience re-exports
pub use pi_expr_ast::Expression;
pub use pi_expr_diagnostics::{ExpressionError, Result};
pub use pi_expr_parser::parse_expression;
pub use pi_expr_sql::{
    AnalyticsType, Boundary, BoundaryTarget, BoundaryType, CompilationRequest, PeriodType,
    ProgramIndicatorEngine,
};
