//! PostgreSQL compilation of program indicator expressions
//!
//! This crate walks a parsed expression and turns it into the SQL fragment an
//! analytics query embeds, a human-readable description, or a validity verdict.
//!
//! ## Architecture
//!
//! - [`Visitor`]: one tree walk that resolves references and checks function calls
//! - [`OutputMode`]: what each node becomes ([`SqlMode`], [`DescriptionMode`],
//!   [`TypeMode`], [`CollectMode`])
//! - [`FunctionRegistry`]: `d2:` functions, built-ins and aggregates
//! - [`ProgramIndicatorEngine`]: parses once per call and drives the passes
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use pi_expr_model::InMemoryMetadata;
//! use pi_expr_sql::{AnalyticsType, CompilationRequest, ProgramIndicatorEngine};
//!
//! let date = NaiveDate::from_ymd_opt(2020, 1, 9).unwrap();
//! let request = CompilationRequest::new(AnalyticsType::Event, "Program000A", date, date);
//! let engine = ProgramIndicatorEngine::new(InMemoryMetadata::new());
//!
//! assert_eq!(engine.analytics_sql("V{event_count} * 2", &request).unwrap(), "case when psi is not null then psi end * 2");
//! ```

pub mod boundary;
pub mod context;
pub mod engine;
pub mod functions;
pub mod items;
pub mod modes;
pub mod variables;
pub mod visitor;

pub use boundary::{
    Boundary, BoundaryOffset, BoundaryTarget, BoundaryType, PeriodType, boundary_subselect,
    enrollment_boundary_clause,
};
pub use context::{AnalyticsType, CompilationContext, CompilationRequest, DEFAULT_TABLE_ALIAS};
pub use engine::ProgramIndicatorEngine;
pub use functions::{FunctionDef, FunctionRegistry};
pub use items::{ItemKind, ResolvedItem};
pub use modes::{CollectMode, DescriptionMode, SqlMode, TypeMode};
pub use variables::ProgramVariable;
pub use visitor::{ItemForm, OutputMode, Visitor};
