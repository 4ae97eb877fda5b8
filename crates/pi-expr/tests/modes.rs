//! Description, validity and item collection

mod common;

use common::{bounded_request, date, engine, latest, request};
use pi_expr::diagnostics::ErrorCode;
use pi_expr::model::DataType;
use pi_expr::sql::ItemKind;
use pi_expr::{AnalyticsType, Boundary, BoundaryTarget, BoundaryType, CompilationRequest};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case(
    "( d2:daysBetween(V{enrollment_date}, V{incident_date}) )  / C{constant00A}",
    "( d2:daysBetween(Enrollment date, Incident date) )  / ConstantA"
)]
#[case("#{ProgrmStagA.DataElmentA} + A{Attribute0A}", "StageA.DataElementA + AttributeA")]
#[case("#{ ProgrmStagA.DataElmentA }*2", "StageA.DataElementA*2")]
#[case("PS_EVENTDATE:ProgrmStagB", "Event date (StageB)")]
#[case(
    "d2:condition('#{ProgrmStagA.DataElmentA} > 3', V{event_count}, 5)",
    "d2:condition('StageA.DataElementA > 3', Event count, 5)"
)]
#[case(
    "d2:countIfCondition(#{ProgrmStagA.DataElmentA}, '>= C{constant00A}')",
    "d2:countIfCondition(StageA.DataElementA, '>= ConstantA')"
)]
#[case("d2:relationshipCount('RelatioTypA')", "d2:relationshipCount('RelationshipTypeA')")]
#[case("1 + 2 > 'text'", "1 + 2 > 'text'")]
fn test_description(#[case] expression: &str, #[case] expected: &str) {
    let description = engine()
        .description(expression, &request(AnalyticsType::Event))
        .unwrap();
    assert_eq!(description, expected);
}

#[test]
fn test_description_fails_like_sql() {
    let request = request(AnalyticsType::Event);
    for expression in [
        "#{ProgrmStagA.DataElmentZ}",
        "d2:zztop(1)",
        "V{no_such_variable}",
        "d2:zing(1, 2)",
    ] {
        let description = engine().description(expression, &request).unwrap_err();
        let sql = engine().analytics_sql(expression, &request).unwrap_err();
        assert_eq!(description, sql, "{expression}");
    }
}

#[rstest]
#[case("#{ProgrmStagA.DataElmentA} * 2", true)]
#[case("d2:zing(#{ProgrmStagA.DataElmentA}) + C{constant00A}", true)]
#[case("d2:zztop(#{ProgrmStagA.DataElmentA})", false)]
#[case("#{ProgrmStagA.DataElmentZ}", false)]
#[case("#{ProgrmStagZ.DataElmentA}", false)]
#[case("#{ProgrmStagA.DataElmentE}", false)]
#[case("#{ProgrmStagB.DataElmentE}", true)]
#[case("D{something}", false)]
#[case("1 +", false)]
#[case("", false)]
fn test_is_valid(#[case] expression: &str, #[case] valid: bool) {
    assert_eq!(engine().is_valid(expression, &request(AnalyticsType::Event)), valid);
}

#[test]
fn test_long_operator_chains_are_rejected() {
    let engine = engine();
    let request = request(AnalyticsType::Event);
    let chain = format!("1{}", " + 1".repeat(10_000));
    let embedded = format!("d2:condition('#{{ProgrmStagA.DataElmentA}}{}', 1, 0)", " > 1".repeat(10_000));

    for expression in [&chain, &embedded] {
        assert!(!engine.is_valid(expression, &request));
        assert!(!engine.filter_is_valid(expression, &request));
        assert_eq!(engine.analytics_sql(expression, &request).unwrap_err().code(), ErrorCode::NestingTooDeep);
        assert!(engine.description(expression, &request).is_err());
    }
}

#[rstest]
#[case("#{ProgrmStagA.DataElmentA} > 3", DataType::Boolean)]
#[case("d2:zing(#{ProgrmStagA.DataElmentA})", DataType::Numeric)]
#[case("d2:maxValue(#{ProgrmStagA.DataElmentD})", DataType::Date)]
#[case("V{enrollment_status}", DataType::Text)]
#[case("A{Attribute0B}", DataType::Numeric)]
#[case("d2:condition('A{Attribute0B}', 'yes', 'no')", DataType::Text)]
fn test_validate_infers_type(#[case] expression: &str, #[case] expected: DataType) {
    assert_eq!(
        engine()
            .validate(expression, &request(AnalyticsType::Event))
            .unwrap(),
        expected
    );
}

#[rstest]
#[case("#{ProgrmStagA.DataElmentA} > 3", true)]
#[case("A{Attribute0B}", true)]
#[case("A{Attribute0B} && #{ProgrmStagB.DataElmentE}", true)]
#[case("d2:hasValue(#{ProgrmStagA.DataElmentA})", true)]
#[case("#{ProgrmStagA.DataElmentA} + 3", false)]
#[case("d2:zztop(1) > 3", false)]
fn test_filter_is_valid(#[case] filter: &str, #[case] valid: bool) {
    assert_eq!(engine().filter_is_valid(filter, &request(AnalyticsType::Event)), valid);
}

#[test]
fn test_boolean_items_in_boolean_context() {
    let request = request(AnalyticsType::Event).with_data_type(DataType::Boolean);
    assert_eq!(
        engine()
            .analytics_sql("A{Attribute0B} and #{ProgrmStagB.DataElmentE}", &request)
            .unwrap(),
        "coalesce(\"Attribute0B\"::numeric!=0,false) and coalesce(\"DataElmentE\"::numeric!=0,false)"
    );
}

#[test]
fn test_boolean_item_in_numeric_context() {
    assert_eq!(
        engine()
            .analytics_sql("A{Attribute0B} + 1", &request(AnalyticsType::Event))
            .unwrap(),
        "coalesce(\"Attribute0B\"::numeric,0) + 1"
    );
}

#[test]
fn test_respect_missing_values() {
    let request = request(AnalyticsType::Event).respecting_missing_values(true);
    assert_eq!(
        engine()
            .analytics_sql("#{ProgrmStagA.DataElmentA} + A{Attribute0A}", &request)
            .unwrap(),
        "\"DataElmentA\" + \"Attribute0A\""
    );
}

#[test]
fn test_respect_missing_values_in_enrollment() {
    let request = bounded_request(AnalyticsType::Enrollment).respecting_missing_values(true);
    assert_eq!(
        engine()
            .analytics_sql("#{ProgrmStagA.DataElmentA} + A{Attribute0A}", &request)
            .unwrap(),
        format!(
            "{} + \"Attribute0A\"",
            latest("\"DataElmentA\"", Some("ProgrmStagA"))
        )
    );
}

#[rstest]
#[case(
    "sum(#{ProgrmStagA.DataElmentA})",
    "sum(coalesce(\"DataElmentA\"::numeric,0))",
    "sum(\"DataElmentA\")"
)]
#[case(
    "d2:countIfValue(#{ProgrmStagA.DataElmentA}, A{Attribute0A})",
    "(select count(\"DataElmentA\") from analytics_event_Program000A where analytics_event_Program000A.pi = ax.pi and \"DataElmentA\" is not null and \"DataElmentA\" = coalesce(\"Attribute0A\"::numeric,0) and ps = 'ProgrmStagA')",
    "(select count(\"DataElmentA\") from analytics_event_Program000A where analytics_event_Program000A.pi = ax.pi and \"DataElmentA\" is not null and \"DataElmentA\" = \"Attribute0A\" and ps = 'ProgrmStagA')"
)]
fn test_respect_missing_values_in_function_arguments(
    #[case] expression: &str,
    #[case] coalesced: &str,
    #[case] respected: &str,
) {
    let engine = engine();
    let request = request(AnalyticsType::Event);
    assert_eq!(engine.analytics_sql(expression, &request).unwrap(), coalesced);
    assert_eq!(
        engine
            .analytics_sql(expression, &request.clone().respecting_missing_values(true))
            .unwrap(),
        respected
    );
}

#[test]
fn test_text_items_are_not_coalesced() {
    assert_eq!(
        engine()
            .analytics_sql(r"#{ProgrmStagA.DataElmentC} == 'it\'s'", &request(AnalyticsType::Event))
            .unwrap(),
        "\"DataElmentC\" = 'it''s'"
    );
}

#[test]
fn test_collect_items_in_order_of_appearance() {
    let items = engine()
        .collect_items(
            "A{Attribute0A} + #{ProgrmStagA.DataElmentA} + V{value_count} + #{ProgrmStagA.DataElmentA} + PS_EVENTDATE:ProgrmStagA + C{constant00A}",
            &request(AnalyticsType::Event),
        )
        .unwrap();

    let keys: Vec<_> = items.iter().map(|item| (item.kind, item.key())).collect();
    assert_eq!(
        keys,
        vec![
            (ItemKind::Attribute, "Attribute0A".to_string()),
            (ItemKind::DataElement, "ProgrmStagA.DataElmentA".to_string()),
        ]
    );
}

#[rstest]
#[case(
    AnalyticsType::Event,
    Some("\"DataElmentA\" is not null or \"Attribute0A\" is not null")
)]
#[case(
    AnalyticsType::Enrollment,
    Some("\"ProgrmStagA_DataElmentA\" is not null or \"Attribute0A\" is not null")
)]
fn test_any_value_exists_clause(#[case] analytics_type: AnalyticsType, #[case] expected: Option<&str>) {
    let clause = engine()
        .any_value_exists_clause(
            "#{ProgrmStagA.DataElmentA} + A{Attribute0A} * V{event_count}",
            &request(analytics_type),
        )
        .unwrap();
    assert_eq!(clause.as_deref(), expected);
}

#[test]
fn test_any_value_exists_clause_without_items() {
    let clause = engine()
        .any_value_exists_clause("V{event_count} + 1", &request(AnalyticsType::Event))
        .unwrap();
    assert_eq!(clause, None);
}

#[test]
fn test_scenario_condition_without_boundaries() {
    assert_eq!(
        engine()
            .analytics_sql(
                "d2:condition('#{ProgrmStagA.DataElmentA} > 3', 10, 5)",
                &request(AnalyticsType::Event)
            )
            .unwrap(),
        "case when (coalesce(\"DataElmentA\"::numeric,0) > 3) then 10 else 5 end"
    );
}

#[test]
fn test_scenario_has_value_with_enrollment_boundary() {
    let request = CompilationRequest::new(
        AnalyticsType::Enrollment,
        "Program000A",
        date("2020-01-01"),
        date("2020-01-31"),
    )
    .with_boundary(Boundary::new(
        BoundaryTarget::EventDate,
        BoundaryType::BeforeEndOfReportingPeriod,
    ));

    assert_eq!(
        engine()
            .analytics_sql("d2:hasValue(#{ProgrmStagA.DataElmentA})", &request)
            .unwrap(),
        "((select \"DataElmentA\" from analytics_event_Program000A where analytics_event_Program000A.pi = ax.pi and \"DataElmentA\" is not null and executiondate < cast( '2020-02-01' as date ) and ps = 'ProgrmStagA' order by executiondate desc limit 1 ) is not null)"
    );
}

#[test]
fn test_scenario_constant() {
    assert_eq!(
        engine()
            .analytics_sql("C{constant00A}", &bounded_request(AnalyticsType::Enrollment))
            .unwrap(),
        "123.456"
    );
}

#[test]
fn test_scenario_illegal_function() {
    let request = request(AnalyticsType::Event);
    assert!(engine().analytics_sql("d2:zztop(#{ProgrmStagA.DataElmentA})", &request).is_err());
    assert!(!engine().is_valid("d2:zztop(#{ProgrmStagA.DataElmentA})", &request));
}
