//! Reporting-period boundaries and the event sub-selects they constrain

use crate::context::{CompilationContext, CompilationRequest};
use chrono::{Days, Months, NaiveDate};
use pi_expr_diagnostics::{ExpressionError, Result};
use serde::{Deserialize, Serialize};

/// Date column a boundary constrains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoundaryTarget {
    EventDate,
    EnrollmentDate,
    IncidentDate,
}

impl BoundaryTarget {
    pub const fn column(&self) -> &'static str {
        match self {
            Self::EventDate => "executiondate",
            Self::EnrollmentDate => "enrollmentdate",
            Self::IncidentDate => "incidentdate",
        }
    }
}

/// Position of a boundary relative to the reporting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoundaryType {
    BeforeStartOfReportingPeriod,
    BeforeEndOfReportingPeriod,
    AfterStartOfReportingPeriod,
    AfterEndOfReportingPeriod,
}

impl BoundaryType {
    /// Comparison against the boundary date; `before` bounds are exclusive
    pub const fn operator(&self) -> &'static str {
        match self {
            Self::BeforeStartOfReportingPeriod | Self::BeforeEndOfReportingPeriod => "<",
            Self::AfterStartOfReportingPeriod | Self::AfterEndOfReportingPeriod => ">=",
        }
    }

    /// Reporting start, or the day after reporting end
    pub fn anchor(&self, start: NaiveDate, end: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::BeforeStartOfReportingPeriod | Self::AfterStartOfReportingPeriod => Some(start),
            Self::BeforeEndOfReportingPeriod | Self::AfterEndOfReportingPeriod => {
                end.checked_add_days(Days::new(1))
            }
        }
    }
}

/// Period unit of a boundary offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodType {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    SixMonthly,
    Yearly,
}

impl PeriodType {
    /// Move `date` by `periods` periods, backwards when negative
    pub fn shift(&self, date: NaiveDate, periods: i32) -> Option<NaiveDate> {
        let count = periods.unsigned_abs();
        let forward = periods >= 0;

        let by_days = |days: u64| {
            if forward {
                date.checked_add_days(Days::new(days))
            } else {
                date.checked_sub_days(Days::new(days))
            }
        };
        let by_months = |months: u32| {
            if forward {
                date.checked_add_months(Months::new(months))
            } else {
                date.checked_sub_months(Months::new(months))
            }
        };

        match self {
            Self::Daily => by_days(u64::from(count)),
            Self::Weekly => by_days(u64::from(count) * 7),
            Self::Monthly => by_months(count),
            Self::Quarterly => by_months(count.checked_mul(3)?),
            Self::SixMonthly => by_months(count.checked_mul(6)?),
            Self::Yearly => by_months(count.checked_mul(12)?),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryOffset {
    pub period_type: PeriodType,
    pub periods: i32,
}

/// A date constraint relative to the reporting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boundary {
    pub target: BoundaryTarget,
    pub boundary_type: BoundaryType,
    #[serde(default)]
    pub offset: Option<BoundaryOffset>,
}

impl Boundary {
    pub const fn new(target: BoundaryTarget, boundary_type: BoundaryType) -> Self {
        Self {
            target,
            boundary_type,
            offset: None,
        }
    }

    pub const fn with_offset(mut self, period_type: PeriodType, periods: i32) -> Self {
        self.offset = Some(BoundaryOffset {
            period_type,
            periods,
        });
        self
    }

    /// Boundary date for the given reporting period
    pub fn date(&self, start: NaiveDate, end: NaiveDate) -> Result<NaiveDate> {
        let anchor = self.boundary_type.anchor(start, end);
        let date = match (anchor, self.offset) {
            (Some(anchor), Some(offset)) => offset.period_type.shift(anchor, offset.periods),
            (anchor, None) => anchor,
            (None, Some(_)) => None,
        };
        date.ok_or_else(|| {
            ExpressionError::invalid_argument(
                "boundary",
                format!("{:?} moves the boundary date out of range", self.offset),
            )
        })
    }

    /// SQL condition, e.g. `executiondate < cast( '2020-01-10' as date )`
    pub fn condition(&self, start: NaiveDate, end: NaiveDate) -> Result<String> {
        let date = self.date(start, end)?;
        Ok(format!(
            "{} {} cast( '{}' as date )",
            self.target.column(),
            self.boundary_type.operator(),
            date.format("%Y-%m-%d")
        ))
    }
}

/// ` and <condition>` for every event-date boundary, in request order
pub(crate) fn event_date_conditions(request: &CompilationRequest) -> Result<String> {
    let conditions = request
        .boundaries
        .iter()
        .filter(|b| b.target == BoundaryTarget::EventDate)
        .map(|b| b.condition(request.start_date, request.end_date))
        .collect::<Result<Vec<_>>>()?;

    Ok(conditions
        .iter()
        .map(|condition| format!(" and {condition}"))
        .collect())
}

/// Latest non-null value of `column` across the enrollment's events, constrained by the
/// event-date boundaries and optionally by program stage
pub fn boundary_subselect(
    cx: &CompilationContext<'_>,
    column: &str,
    stage: Option<&str>,
) -> Result<String> {
    let table = cx.event_table();
    let conditions = event_date_conditions(cx.request)?;
    let stage_filter = stage
        .map(|stage| format!(" and ps = '{stage}'"))
        .unwrap_or_default();

    log::trace!("boundary sub-select for {column} with{conditions}");

    Ok(format!(
        "(select {column} from {table} where {table}.pi = {alias}.pi and {column} is not null{conditions}{stage_filter} order by executiondate desc limit 1 )",
        alias = cx.table_alias(),
    ))
}

/// Where-clause fragment for enrollment- and incident-date boundaries, for the caller's
/// enrollment query. `None` when the request has no such boundaries.
pub fn enrollment_boundary_clause(request: &CompilationRequest) -> Result<Option<String>> {
    let conditions = request
        .boundaries
        .iter()
        .filter(|b| b.target != BoundaryTarget::EventDate)
        .map(|b| b.condition(request.start_date, request.end_date))
        .collect::<Result<Vec<_>>>()?;

    Ok((!conditions.is_empty()).then(|| conditions.join(" and ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AnalyticsType;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[rstest]
    #[case(BoundaryType::BeforeStartOfReportingPeriod, "executiondate < cast( '2020-01-01' as date )")]
    #[case(BoundaryType::BeforeEndOfReportingPeriod, "executiondate < cast( '2020-02-01' as date )")]
    #[case(BoundaryType::AfterStartOfReportingPeriod, "executiondate >= cast( '2020-01-01' as date )")]
    #[case(BoundaryType::AfterEndOfReportingPeriod, "executiondate >= cast( '2020-02-01' as date )")]
    fn test_condition_anchors(#[case] boundary_type: BoundaryType, #[case] expected: &str) {
        let boundary = Boundary::new(BoundaryTarget::EventDate, boundary_type);
        assert_eq!(
            boundary.condition(date("2020-01-01"), date("2020-01-31")).unwrap(),
            expected
        );
    }

    #[rstest]
    #[case(PeriodType::Daily, 10, "2020-01-11")]
    #[case(PeriodType::Daily, -1, "2019-12-31")]
    #[case(PeriodType::Weekly, 2, "2020-01-15")]
    #[case(PeriodType::Monthly, -1, "2019-12-01")]
    #[case(PeriodType::Quarterly, 1, "2020-04-01")]
    #[case(PeriodType::SixMonthly, 1, "2020-07-01")]
    #[case(PeriodType::Yearly, -2, "2018-01-01")]
    fn test_offsets_from_end(#[case] period_type: PeriodType, #[case] periods: i32, #[case] expected: &str) {
        let boundary = Boundary::new(BoundaryTarget::EventDate, BoundaryType::BeforeEndOfReportingPeriod)
            .with_offset(period_type, periods);
        assert_eq!(
            boundary.date(date("2019-01-01"), date("2019-12-31")).unwrap(),
            date(expected)
        );
    }

    #[test]
    fn test_offset_out_of_range() {
        let boundary = Boundary::new(BoundaryTarget::EventDate, BoundaryType::AfterStartOfReportingPeriod)
            .with_offset(PeriodType::Yearly, i32::MAX);
        assert!(boundary.date(date("2020-01-01"), date("2020-12-31")).is_err());
    }

    #[test]
    fn test_event_date_conditions_skip_other_targets() {
        let request = CompilationRequest::new(
            AnalyticsType::Enrollment,
            "Program000A",
            date("2020-01-09"),
            date("2020-01-09"),
        )
        .with_boundary(Boundary::new(
            BoundaryTarget::EventDate,
            BoundaryType::BeforeEndOfReportingPeriod,
        ))
        .with_boundary(Boundary::new(
            BoundaryTarget::EnrollmentDate,
            BoundaryType::AfterStartOfReportingPeriod,
        ))
        .with_boundary(Boundary::new(
            BoundaryTarget::EventDate,
            BoundaryType::AfterStartOfReportingPeriod,
        ));

        assert_eq!(
            event_date_conditions(&request).unwrap(),
            " and executiondate < cast( '2020-01-10' as date ) and executiondate >= cast( '2020-01-09' as date )"
        );
        assert_eq!(
            enrollment_boundary_clause(&request).unwrap().as_deref(),
            Some("enrollmentdate >= cast( '2020-01-09' as date )")
        );
    }

    #[test]
    fn test_event_date_conditions_propagate_offset_errors() {
        let request = CompilationRequest::new(
            AnalyticsType::Event,
            "Program000A",
            date("2020-01-01"),
            date("2020-12-31"),
        )
        .with_boundary(Boundary::new(
            BoundaryTarget::EventDate,
            BoundaryType::AfterStartOfReportingPeriod,
        ))
        .with_boundary(
            Boundary::new(BoundaryTarget::EventDate, BoundaryType::BeforeEndOfReportingPeriod)
                .with_offset(PeriodType::Monthly, i32::MIN),
        );
        assert!(event_date_conditions(&request).is_err());
    }

    #[test]
    fn test_no_boundaries() {
        let request = CompilationRequest::new(
            AnalyticsType::Event,
            "Program000A",
            date("2020-01-01"),
            date("2020-12-31"),
        );
        assert_eq!(event_date_conditions(&request).unwrap(), "");
        assert_eq!(enrollment_boundary_clause(&request).unwrap(), None);
    }
}
