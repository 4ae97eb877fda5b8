//! Program variables (`V{name}`)

use crate::boundary::boundary_subselect;
use crate::context::{AnalyticsType, CompilationContext};
use crate::items::value_sql;
use chrono::NaiveDate;
use pi_expr_diagnostics::{ExpressionError, Result};
use pi_expr_model::DataType;

/// Count expression used by `V{event_count}`
pub const DEFAULT_COUNT_CONDITION: &str = "case when psi is not null then psi end";

/// A known program variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramVariable {
    AnalyticsPeriodStart,
    AnalyticsPeriodEnd,
    CurrentDate,
    EnrollmentDate,
    IncidentDate,
    EnrollmentStatus,
    EventDate,
    DueDate,
    CreationDate,
    CompletedDate,
    EventStatus,
    ProgramStageId,
    ProgramStageName,
    EnrollmentCount,
    EventCount,
    OrgUnitCount,
    TeiCount,
    ValueCount,
    ZeroPosValueCount,
}

impl ProgramVariable {
    /// Look up a variable by the name written inside `V{...}`
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "analytics_period_start" => Self::AnalyticsPeriodStart,
            "analytics_period_end" => Self::AnalyticsPeriodEnd,
            "current_date" => Self::CurrentDate,
            "enrollment_date" => Self::EnrollmentDate,
            "incident_date" => Self::IncidentDate,
            "enrollment_status" => Self::EnrollmentStatus,
            "execution_date" | "event_date" => Self::EventDate,
            "due_date" | "scheduled_date" => Self::DueDate,
            "creation_date" => Self::CreationDate,
            "completed_date" => Self::CompletedDate,
            "event_status" => Self::EventStatus,
            "program_stage_id" => Self::ProgramStageId,
            "program_stage_name" => Self::ProgramStageName,
            "enrollment_count" => Self::EnrollmentCount,
            "event_count" => Self::EventCount,
            "org_unit_count" => Self::OrgUnitCount,
            "tei_count" => Self::TeiCount,
            "value_count" => Self::ValueCount,
            "zero_pos_value_count" => Self::ZeroPosValueCount,
            _ => return None,
        })
    }

    /// Like [`from_name`](Self::from_name), failing with an unknown-variable error
    pub fn resolve(name: &str) -> Result<Self> {
        Self::from_name(name).ok_or_else(|| ExpressionError::unknown_variable(name))
    }

    /// Human readable name used by description mode
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::AnalyticsPeriodStart => "Analytics period start",
            Self::AnalyticsPeriodEnd => "Analytics period end",
            Self::CurrentDate => "Current date",
            Self::EnrollmentDate => "Enrollment date",
            Self::IncidentDate => "Incident date",
            Self::EnrollmentStatus => "Enrollment status",
            Self::EventDate => "Event date",
            Self::DueDate => "Due date",
            Self::CreationDate => "Creation date",
            Self::CompletedDate => "Completed date",
            Self::EventStatus => "Event status",
            Self::ProgramStageId => "Program stage id",
            Self::ProgramStageName => "Program stage name",
            Self::EnrollmentCount => "Enrollment count",
            Self::EventCount => "Event count",
            Self::OrgUnitCount => "Org unit count",
            Self::TeiCount => "Tracked entity instance count",
            Self::ValueCount => "Value count",
            Self::ZeroPosValueCount => "Zero or positive value count",
        }
    }

    pub const fn data_type(&self) -> DataType {
        match self {
            Self::AnalyticsPeriodStart
            | Self::AnalyticsPeriodEnd
            | Self::CurrentDate
            | Self::EnrollmentDate
            | Self::IncidentDate
            | Self::EventDate
            | Self::DueDate
            | Self::CreationDate
            | Self::CompletedDate => DataType::Date,
            Self::EnrollmentStatus
            | Self::EventStatus
            | Self::ProgramStageId
            | Self::ProgramStageName => DataType::Text,
            Self::EnrollmentCount
            | Self::EventCount
            | Self::OrgUnitCount
            | Self::TeiCount
            | Self::ValueCount
            | Self::ZeroPosValueCount => DataType::Numeric,
        }
    }

    /// SQL for the variable under the context's analytics type
    pub fn sql(&self, cx: &CompilationContext<'_>) -> Result<String> {
        Ok(match self {
            Self::AnalyticsPeriodStart => date_literal(cx.request.start_date),
            Self::AnalyticsPeriodEnd => date_literal(cx.request.end_date),
            Self::CurrentDate => date_literal(cx.today),
            Self::EnrollmentDate => "enrollmentdate".to_string(),
            Self::IncidentDate => "incidentdate".to_string(),
            Self::EnrollmentStatus => "pistatus".to_string(),
            Self::EventDate => event_scoped(cx, "executiondate")?,
            Self::DueDate => event_scoped(cx, "duedate")?,
            Self::CreationDate => event_scoped(cx, "created")?,
            Self::CompletedDate => event_scoped(cx, "completeddate")?,
            Self::EventStatus => event_scoped(cx, "psistatus")?,
            Self::ProgramStageId => event_scoped(cx, "ps")?,
            Self::ProgramStageName => format!(
                "(select name from programstage where uid = {})",
                event_scoped(cx, "ps")?
            ),
            Self::EnrollmentCount => match cx.analytics_type() {
                AnalyticsType::Event => "distinct pi".to_string(),
                AnalyticsType::Enrollment => "pi".to_string(),
            },
            Self::EventCount => DEFAULT_COUNT_CONDITION.to_string(),
            Self::OrgUnitCount => "distinct ou".to_string(),
            Self::TeiCount => "distinct tei".to_string(),
            Self::ValueCount => value_count(cx, "is not null")?,
            Self::ZeroPosValueCount => value_count(cx, ">= 0")?,
        })
    }
}

/// Event columns are read directly in event analytics and through the latest event otherwise
fn event_scoped(cx: &CompilationContext<'_>, column: &str) -> Result<String> {
    match cx.analytics_type() {
        AnalyticsType::Event => Ok(column.to_string()),
        AnalyticsType::Enrollment => boundary_subselect(cx, column, None),
    }
}

fn date_literal(date: NaiveDate) -> String {
    format!("'{}'", date.format("%Y-%m-%d"))
}

/// Number of referenced items whose value satisfies `predicate`, null when none do
fn value_count(cx: &CompilationContext<'_>, predicate: &str) -> Result<String> {
    if cx.items.is_empty() {
        return Ok("0".to_string());
    }

    let terms = cx
        .items
        .values()
        .map(|item| {
            value_sql(cx, item).map(|raw| format!("case when {raw} {predicate} then 1 else 0 end"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(
        "nullif(cast(({}) as double precision),0)",
        terms.join(" + ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CompilationRequest;
    use crate::functions::FunctionRegistry;
    use crate::items::{ItemKind, ResolvedItem};
    use indexmap::IndexMap;
    use pi_expr_model::{InMemoryMetadata, ValueType};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn request(analytics_type: AnalyticsType) -> CompilationRequest {
        CompilationRequest::new(
            analytics_type,
            "Program000A",
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 31).unwrap(),
        )
        .with_today(NaiveDate::from_ymd_opt(2020, 3, 15).unwrap())
    }

    fn compile(name: &str, analytics_type: AnalyticsType) -> String {
        let metadata = InMemoryMetadata::new();
        let functions = FunctionRegistry::new();
        let request = request(analytics_type);
        let cx = CompilationContext::new(&request, &metadata, &functions);
        ProgramVariable::resolve(name).unwrap().sql(&cx).unwrap()
    }

    #[rstest]
    #[case("analytics_period_start", "'2020-01-01'")]
    #[case("analytics_period_end", "'2020-01-31'")]
    #[case("current_date", "'2020-03-15'")]
    #[case("enrollment_date", "enrollmentdate")]
    #[case("incident_date", "incidentdate")]
    #[case("enrollment_status", "pistatus")]
    #[case("event_date", "executiondate")]
    #[case("execution_date", "executiondate")]
    #[case("scheduled_date", "duedate")]
    #[case("creation_date", "created")]
    #[case("completed_date", "completeddate")]
    #[case("event_status", "psistatus")]
    #[case("program_stage_id", "ps")]
    #[case("program_stage_name", "(select name from programstage where uid = ps)")]
    #[case("enrollment_count", "distinct pi")]
    #[case("event_count", DEFAULT_COUNT_CONDITION)]
    #[case("org_unit_count", "distinct ou")]
    #[case("tei_count", "distinct tei")]
    #[case("value_count", "0")]
    #[case("zero_pos_value_count", "0")]
    fn test_event_variables(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(compile(name, AnalyticsType::Event), expected);
    }

    #[rstest]
    #[case("enrollment_count", "pi")]
    #[case("enrollment_date", "enrollmentdate")]
    #[case(
        "due_date",
        "(select duedate from analytics_event_Program000A where analytics_event_Program000A.pi = ax.pi and duedate is not null order by executiondate desc limit 1 )"
    )]
    #[case(
        "program_stage_name",
        "(select name from programstage where uid = (select ps from analytics_event_Program000A where analytics_event_Program000A.pi = ax.pi and ps is not null order by executiondate desc limit 1 ))"
    )]
    fn test_enrollment_variables(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(compile(name, AnalyticsType::Enrollment), expected);
    }

    #[test]
    fn test_unknown_variable() {
        let err = ProgramVariable::resolve("nope").unwrap_err();
        assert_eq!(err.to_string(), "PI0102: Unknown program variable 'V{nope}'");
    }

    #[test]
    fn test_value_count_over_items() {
        let metadata = InMemoryMetadata::new();
        let functions = FunctionRegistry::new();
        let request = request(AnalyticsType::Event);
        let items: IndexMap<_, _> = ["DataElmentA", "Attribute0A"]
            .into_iter()
            .map(|uid| {
                let item = ResolvedItem {
                    kind: ItemKind::Attribute,
                    uid: uid.to_string(),
                    stage: None,
                    name: uid.to_string(),
                    value_type: ValueType::Number,
                };
                (item.key(), item)
            })
            .collect();
        let cx = CompilationContext::new(&request, &metadata, &functions).with_items(items);

        assert_eq!(
            ProgramVariable::ValueCount.sql(&cx).unwrap(),
            "nullif(cast((case when \"DataElmentA\" is not null then 1 else 0 end + case when \"Attribute0A\" is not null then 1 else 0 end) as double precision),0)"
        );
        assert_eq!(
            ProgramVariable::ZeroPosValueCount.sql(&cx).unwrap(),
            "nullif(cast((case when \"DataElmentA\" >= 0 then 1 else 0 end + case when \"Attribute0A\" >= 0 then 1 else 0 end) as double precision),0)"
        );
    }
}
