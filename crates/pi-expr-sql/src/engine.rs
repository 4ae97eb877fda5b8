//! Program indicator compilation engine
//!
//! This module provides [`ProgramIndicatorEngine`], the entry point that parses an
//! expression once and walks it in the requested mode.

use crate::context::{AnalyticsType, CompilationContext, CompilationRequest};
use crate::functions::FunctionRegistry;
use crate::items::{ItemKind, ResolvedItem};
use crate::modes::{CollectMode, DescriptionMode, SqlMode, TypeMode};
use crate::visitor::Visitor;
use indexmap::IndexMap;
use pi_expr_ast::{Expression, Spanned};
use pi_expr_diagnostics::Result;
use pi_expr_model::{DataType, MetadataProvider};
use pi_expr_parser::{ParserConfig, parse_expression_with};

/// Compiles program indicator expressions against a metadata provider
///
/// The engine holds no per-call state; every call builds its own context, so one
/// engine can serve concurrent compilations.
pub struct ProgramIndicatorEngine<P> {
    metadata: P,
    functions: FunctionRegistry,
    parser: ParserConfig,
}

impl<P: MetadataProvider> ProgramIndicatorEngine<P> {
    /// Create an engine with the standard function library
    pub fn new(metadata: P) -> Self {
        Self {
            metadata,
            functions: FunctionRegistry::with_standard_functions(),
            parser: ParserConfig::default(),
        }
    }

    /// Create an engine with a custom function registry
    pub fn with_functions(metadata: P, functions: FunctionRegistry) -> Self {
        Self {
            metadata,
            functions,
            parser: ParserConfig::default(),
        }
    }

    pub fn with_parser_config(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    /// Get a mutable reference to the function registry
    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn metadata(&self) -> &P {
        &self.metadata
    }

    fn context<'a>(&'a self, request: &'a CompilationRequest) -> CompilationContext<'a> {
        CompilationContext::new(request, &self.metadata, &self.functions)
            .with_parser_config(self.parser)
    }

    fn parse(&self, expression: &str) -> Result<Spanned<Expression>> {
        parse_expression_with(expression, &self.parser)
    }

    fn collect(
        &self,
        ast: &Spanned<Expression>,
        request: &CompilationRequest,
    ) -> Result<IndexMap<String, ResolvedItem>> {
        let cx = self.context(request);
        let mut visitor = Visitor::new(&cx, CollectMode::new());
        visitor.visit_root(ast)?;
        Ok(visitor.into_mode().into_items())
    }

    /// Compile an expression or filter into SQL
    pub fn analytics_sql(&self, expression: &str, request: &CompilationRequest) -> Result<String> {
        log::debug!(
            "compiling {:?} expression for program {}: {expression}",
            request.analytics_type,
            request.program
        );

        let ast = self.parse(expression)?;
        let items = self.collect(&ast, request)?;
        let cx = self.context(request).with_items(items);
        let sql = Visitor::new(&cx, SqlMode).visit_root(&ast)?;

        log::debug!("compiled to {sql}");
        Ok(sql)
    }

    /// Replace references in the expression with their display names
    pub fn description(&self, expression: &str, request: &CompilationRequest) -> Result<String> {
        log::debug!("describing expression: {expression}");

        let ast = self.parse(expression)?;
        let cx = self.context(request);
        let mut visitor = Visitor::new(&cx, DescriptionMode::new());
        visitor.visit_root(&ast)?;
        Ok(visitor.into_mode().render(expression))
    }

    /// Check an expression, returning its result type
    pub fn validate(&self, expression: &str, request: &CompilationRequest) -> Result<DataType> {
        let ast = self.parse(expression)?;
        let items = self.collect(&ast, request)?;
        let cx = self.context(request).with_items(items);
        Visitor::new(&cx, TypeMode).visit_root(&ast)
    }

    /// Whether the expression compiles; never fails
    pub fn is_valid(&self, expression: &str, request: &CompilationRequest) -> bool {
        match self.validate(expression, request) {
            Ok(_) => true,
            Err(err) if err.code().is_syntax() => {
                log::debug!("malformed expression '{expression}': {err}");
                false
            }
            Err(err) => {
                log::debug!("invalid expression '{expression}': {err}");
                false
            }
        }
    }

    /// Whether the expression compiles and yields a boolean
    pub fn filter_is_valid(&self, filter: &str, request: &CompilationRequest) -> bool {
        let request = request.clone().with_data_type(DataType::Boolean);
        match self.validate(filter, &request) {
            Ok(DataType::Boolean) => true,
            Ok(data_type) => {
                log::debug!("filter '{filter}' evaluates to {data_type}, not boolean");
                false
            }
            Err(err) => {
                log::debug!("invalid filter '{filter}': {err}");
                false
            }
        }
    }

    /// Data elements and attributes referenced by the expression, in order of appearance
    pub fn collect_items(
        &self,
        expression: &str,
        request: &CompilationRequest,
    ) -> Result<Vec<ResolvedItem>> {
        let ast = self.parse(expression)?;
        Ok(self.collect(&ast, request)?.into_values().collect())
    }

    /// `"<col>" is not null or ...` over the referenced data elements and attributes.
    ///
    /// Enrollment analytics read data elements from `"<stage>_<element>"` columns of the
    /// enrollment table. `None` when nothing is referenced.
    pub fn any_value_exists_clause(
        &self,
        expression: &str,
        request: &CompilationRequest,
    ) -> Result<Option<String>> {
        let items = self.collect_items(expression, request)?;
        let clauses: Vec<_> = items
            .iter()
            .map(|item| {
                let column = match (request.analytics_type, item.kind, &item.stage) {
                    (AnalyticsType::Enrollment, ItemKind::DataElement, Some(stage)) => {
                        format!("\"{stage}_{}\"", item.uid)
                    }
                    _ => item.quoted_column(),
                };
                format!("{column} is not null")
            })
            .collect();

        Ok((!clauses.is_empty()).then(|| clauses.join(" or ")))
    }
}
