//! Compilation request and per-call context

use crate::boundary::Boundary;
use crate::functions::FunctionRegistry;
use crate::items::ResolvedItem;
use chrono::NaiveDate;
use indexmap::IndexMap;
use pi_expr_model::{DataType, MetadataProvider};
use pi_expr_parser::ParserConfig;
use serde::{Deserialize, Serialize};

/// Alias of the enrollment or event row in the enclosing analytics query
pub const DEFAULT_TABLE_ALIAS: &str = "ax";

/// Level at which the indicator is aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalyticsType {
    /// One row per event; data element references are plain columns
    #[default]
    Event,
    /// One row per enrollment; data element references become correlated sub-selects
    Enrollment,
}

fn default_table_alias() -> String {
    DEFAULT_TABLE_ALIAS.to_string()
}

/// Everything a compilation needs besides the expression text and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationRequest {
    pub analytics_type: AnalyticsType,
    /// Program uid, selects the `analytics_event_<program>` table
    pub program: String,
    #[serde(default = "default_table_alias")]
    pub table_alias: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Conjunctive date constraints; empty means no date filter
    #[serde(default)]
    pub boundaries: Vec<Boundary>,
    /// Emit bare columns instead of coalescing missing values to zero
    #[serde(default)]
    pub respect_missing_values: bool,
    /// Expected result type: numeric for indicator expressions, boolean for filters
    #[serde(default)]
    pub data_type: DataType,
    /// Fixed value for `V{current_date}`; defaults to the local date
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

impl CompilationRequest {
    pub fn new(
        analytics_type: AnalyticsType,
        program: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            analytics_type,
            program: program.into(),
            table_alias: default_table_alias(),
            start_date,
            end_date,
            boundaries: Vec::new(),
            respect_missing_values: false,
            data_type: DataType::Numeric,
            today: None,
        }
    }

    /// Load a request from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_boundary(mut self, boundary: Boundary) -> Self {
        self.boundaries.push(boundary);
        self
    }

    pub fn with_boundaries(mut self, boundaries: impl IntoIterator<Item = Boundary>) -> Self {
        self.boundaries.extend(boundaries);
        self
    }

    pub fn with_table_alias(mut self, alias: impl Into<String>) -> Self {
        self.table_alias = alias.into();
        self
    }

    pub fn respecting_missing_values(mut self, respect: bool) -> Self {
        self.respect_missing_values = respect;
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Name of the program's event analytics table
    pub fn event_table(&self) -> String {
        format!("analytics_event_{}", self.program)
    }
}

/// Read-only state shared by every node visit of one compilation
pub struct CompilationContext<'a> {
    pub request: &'a CompilationRequest,
    pub metadata: &'a dyn MetadataProvider,
    pub functions: &'a FunctionRegistry,
    pub parser: ParserConfig,
    /// Data elements and attributes referenced by the expression, in order of appearance
    pub items: IndexMap<String, ResolvedItem>,
    pub today: NaiveDate,
}

impl<'a> CompilationContext<'a> {
    pub fn new(
        request: &'a CompilationRequest,
        metadata: &'a dyn MetadataProvider,
        functions: &'a FunctionRegistry,
    ) -> Self {
        Self {
            request,
            metadata,
            functions,
            parser: ParserConfig::default(),
            items: IndexMap::new(),
            today: request
                .today
                .unwrap_or_else(|| chrono::Local::now().date_naive()),
        }
    }

    pub fn with_parser_config(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    /// Attach the item set collected by a first pass over the expression
    pub fn with_items(mut self, items: IndexMap<String, ResolvedItem>) -> Self {
        self.items = items;
        self
    }

    pub fn analytics_type(&self) -> AnalyticsType {
        self.request.analytics_type
    }

    pub fn table_alias(&self) -> &str {
        &self.request.table_alias
    }

    pub fn event_table(&self) -> String {
        self.request.event_table()
    }
}
