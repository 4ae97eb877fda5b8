//! Analytics period boundaries and request configuration

mod common;

use common::{EVENT_TABLE, date, engine, metadata};
use pi_expr::model::InMemoryMetadata;
use pi_expr::sql::enrollment_boundary_clause;
use pi_expr::{
    AnalyticsType, Boundary, BoundaryTarget, BoundaryType, CompilationRequest, PeriodType,
    ProgramIndicatorEngine,
};
use pretty_assertions::assert_eq;
use std::io::Write;

fn year_2019(analytics_type: AnalyticsType) -> CompilationRequest {
    CompilationRequest::new(analytics_type, "Program000A", date("2019-01-01"), date("2019-12-31"))
}

#[test]
fn test_offset_boundary() {
    let request = year_2019(AnalyticsType::Enrollment).with_boundary(
        Boundary::new(BoundaryTarget::EventDate, BoundaryType::BeforeEndOfReportingPeriod)
            .with_offset(PeriodType::Daily, 10),
    );

    let sql = engine()
        .analytics_sql("d2:count(#{ProgrmStagA.DataElmentA})", &request)
        .unwrap();
    assert_eq!(
        sql,
        format!(
            "(select count(\"DataElmentA\") from {EVENT_TABLE} where {EVENT_TABLE}.pi = ax.pi and \"DataElmentA\" is not null and \"DataElmentA\" is not null and executiondate < cast( '2020-01-11' as date ) and ps = 'ProgrmStagA')"
        )
    );
}

#[test]
fn test_boundaries_render_in_request_order() {
    let request = year_2019(AnalyticsType::Enrollment)
        .with_boundary(Boundary::new(
            BoundaryTarget::EventDate,
            BoundaryType::AfterStartOfReportingPeriod,
        ))
        .with_boundary(
            Boundary::new(BoundaryTarget::EventDate, BoundaryType::BeforeStartOfReportingPeriod)
                .with_offset(PeriodType::Monthly, 2),
        );

    let sql = engine()
        .analytics_sql("V{event_date}", &request)
        .unwrap();
    assert_eq!(
        sql,
        format!(
            "(select executiondate from {EVENT_TABLE} where {EVENT_TABLE}.pi = ax.pi and executiondate is not null and executiondate >= cast( '2019-01-01' as date ) and executiondate < cast( '2019-03-01' as date ) order by executiondate desc limit 1 )"
        )
    );
}

#[test]
fn test_enrollment_boundaries_do_not_constrain_events() {
    let request = year_2019(AnalyticsType::Enrollment)
        .with_boundary(Boundary::new(
            BoundaryTarget::EnrollmentDate,
            BoundaryType::AfterStartOfReportingPeriod,
        ))
        .with_boundary(Boundary::new(
            BoundaryTarget::IncidentDate,
            BoundaryType::BeforeEndOfReportingPeriod,
        ));

    let sql = engine()
        .analytics_sql("d2:hasValue(#{ProgrmStagA.DataElmentA})", &request)
        .unwrap();
    assert!(!sql.contains("enrollmentdate"), "{sql}");
    assert!(!sql.contains("executiondate <"), "{sql}");

    assert_eq!(
        enrollment_boundary_clause(&request).unwrap().as_deref(),
        Some(
            "enrollmentdate >= cast( '2019-01-01' as date ) and incidentdate < cast( '2020-01-01' as date )"
        )
    );
}

#[test]
fn test_out_of_range_offset_is_an_error() {
    let request = year_2019(AnalyticsType::Enrollment).with_boundary(
        Boundary::new(BoundaryTarget::EventDate, BoundaryType::AfterEndOfReportingPeriod)
            .with_offset(PeriodType::Yearly, i32::MAX),
    );
    assert!(engine().analytics_sql("V{event_date}", &request).is_err());
    assert!(!engine().is_valid("V{event_date}", &request));
}

#[test]
fn test_request_from_json() {
    let request = CompilationRequest::from_json(
        r#"{
            "analyticsType": "ENROLLMENT",
            "program": "Program000A",
            "tableAlias": "enr",
            "startDate": "2020-01-09",
            "endDate": "2020-01-09",
            "boundaries": [
                {
                    "target": "EVENT_DATE",
                    "boundaryType": "AFTER_START_OF_REPORTING_PERIOD",
                    "offset": {"periodType": "WEEKLY", "periods": -1}
                }
            ]
        }"#,
    )
    .unwrap();

    let sql = engine()
        .analytics_sql("d2:maxValue(#{ProgrmStagA.DataElmentA})", &request)
        .unwrap();
    assert_eq!(
        sql,
        format!(
            "(select max(\"DataElmentA\") from {EVENT_TABLE} where {EVENT_TABLE}.pi = enr.pi and executiondate >= cast( '2020-01-02' as date ) and ps = 'ProgrmStagA')"
        )
    );
}

#[test]
fn test_metadata_from_json_file() {
    let json = serde_json::to_string(&metadata().to_set()).unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let engine = ProgramIndicatorEngine::new(InMemoryMetadata::from_json_file(file.path()).unwrap());
    let request = year_2019(AnalyticsType::Event);
    assert_eq!(
        engine
            .description("#{ProgrmStagB.DataElmentE} + C{constant00A}", &request)
            .unwrap(),
        "StageB.DataElementE + ConstantA"
    );
    assert!(!engine.is_valid("#{ProgrmStagA.DataElmentE}", &request));
}
