//! Shared fixtures for compilation tests

#![allow(dead_code)]

use chrono::NaiveDate;
use pi_expr::model::{
    AttributeInfo, ConstantInfo, DataElementInfo, InMemoryMetadata, ProgramStageInfo,
    RelationshipTypeInfo, ValueType,
};
use pi_expr::{
    AnalyticsType, Boundary, BoundaryTarget, BoundaryType, CompilationRequest,
    ProgramIndicatorEngine,
};
use rust_decimal::Decimal;
use std::str::FromStr;

pub const EVENT_TABLE: &str = "analytics_event_Program000A";

/// Event-date conditions produced by [`bounded_request`]
pub const BOUNDARY_CONDITIONS: &str =
    " and executiondate < cast( '2020-01-10' as date ) and executiondate >= cast( '2020-01-09' as date )";

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn metadata() -> InMemoryMetadata {
    InMemoryMetadata::new()
        .with_program_stage(ProgramStageInfo::new("ProgrmStagA", "StageA"))
        .with_program_stage(ProgramStageInfo::new("ProgrmStagB", "StageB"))
        .with_data_element(DataElementInfo::new("DataElmentA", "DataElementA", ValueType::Number))
        .with_data_element(DataElementInfo::new("DataElmentB", "DataElementB", ValueType::Integer))
        .with_data_element(DataElementInfo::new("DataElmentC", "DataElementC", ValueType::Text))
        .with_data_element(DataElementInfo::new("DataElmentD", "DataElementD", ValueType::Date))
        .with_data_element(
            DataElementInfo::new("DataElmentE", "DataElementE", ValueType::Boolean)
                .in_stage("ProgrmStagB"),
        )
        .with_attribute(AttributeInfo::new("Attribute0A", "AttributeA", ValueType::Number))
        .with_attribute(AttributeInfo::new("Attribute0B", "AttributeB", ValueType::TrueOnly))
        .with_constant(ConstantInfo::new(
            "constant00A",
            "ConstantA",
            Decimal::from_str("123.456").unwrap(),
        ))
        .with_relationship_type(RelationshipTypeInfo::new("RelatioTypA", "RelationshipTypeA"))
}

pub fn engine() -> ProgramIndicatorEngine<InMemoryMetadata> {
    ProgramIndicatorEngine::new(metadata())
}

/// Single-day reporting period 2020-01-09, no boundaries
pub fn request(analytics_type: AnalyticsType) -> CompilationRequest {
    CompilationRequest::new(analytics_type, "Program000A", date("2020-01-09"), date("2020-01-09"))
}

/// [`request`] constrained to events before the end and after the start of the period
pub fn bounded_request(analytics_type: AnalyticsType) -> CompilationRequest {
    request(analytics_type)
        .with_boundary(Boundary::new(
            BoundaryTarget::EventDate,
            BoundaryType::BeforeEndOfReportingPeriod,
        ))
        .with_boundary(Boundary::new(
            BoundaryTarget::EventDate,
            BoundaryType::AfterStartOfReportingPeriod,
        ))
}

/// Latest-event sub-select for `column` under [`bounded_request`]
pub fn latest(column: &str, stage: Option<&str>) -> String {
    let stage = stage
        .map(|stage| format!(" and ps = '{stage}'"))
        .unwrap_or_default();
    format!(
        "(select {column} from {EVENT_TABLE} where {EVENT_TABLE}.pi = ax.pi and {column} is not null{BOUNDARY_CONDITIONS}{stage} order by executiondate desc limit 1 )"
    )
}
