//! `d2:` functions

use super::{Arg, ArgKind, Call, FunctionDef, FunctionRegistry, ReturnType};
use crate::boundary::event_date_conditions;
use crate::context::{AnalyticsType, CompilationContext};
use crate::items::ResolvedItem;
use pi_expr_diagnostics::{Arity, Result, Span};
use pi_expr_model::DataType;

use ArgKind::{Comparison, Condition, Item, RawValue, RelationshipType, Value};

const NUMERIC: ReturnType = ReturnType::Fixed(DataType::Numeric);

pub(super) fn register(registry: &mut FunctionRegistry) {
    let one = Arity::exactly(1);
    let two = Arity::exactly(2);

    registry.register(FunctionDef::new(
        "d2:condition",
        Arity::exactly(3),
        &[Condition, Value, Value],
        ReturnType::SameAs(1),
        condition,
    ));
    registry.register(FunctionDef::new("d2:count", one, &[Item], NUMERIC, count));
    registry.register(FunctionDef::new(
        "d2:countIfCondition",
        two,
        &[Item, Comparison],
        NUMERIC,
        count_if_condition,
    ));
    registry.register(FunctionDef::new(
        "d2:countIfValue",
        two,
        &[Item, Value],
        NUMERIC,
        count_if_value,
    ));
    registry.register(FunctionDef::new("d2:daysBetween", two, &[RawValue], NUMERIC, days_between));
    registry.register(FunctionDef::new("d2:weeksBetween", two, &[RawValue], NUMERIC, weeks_between));
    registry.register(FunctionDef::new("d2:monthsBetween", two, &[RawValue], NUMERIC, months_between));
    registry.register(FunctionDef::new("d2:yearsBetween", two, &[RawValue], NUMERIC, years_between));
    registry.register(FunctionDef::new(
        "d2:minutesBetween",
        two,
        &[RawValue],
        NUMERIC,
        minutes_between,
    ));
    registry.register(FunctionDef::new(
        "d2:hasValue",
        one,
        &[RawValue],
        ReturnType::Fixed(DataType::Boolean),
        has_value,
    ));
    registry.register(FunctionDef::new("d2:maxValue", one, &[Item], ReturnType::SameAs(0), max_value));
    registry.register(FunctionDef::new("d2:minValue", one, &[Item], ReturnType::SameAs(0), min_value));
    registry.register(FunctionDef::new("d2:oizp", one, &[RawValue], NUMERIC, oizp));
    registry.register(
        FunctionDef::new(
            "d2:relationshipCount",
            Arity::new(0, Some(1)),
            &[RelationshipType],
            NUMERIC,
            relationship_count,
        )
        .with_describe(describe_relationship_type),
    );
    registry.register(FunctionDef::new("d2:zing", one, &[RawValue], NUMERIC, zing));
    registry.register(FunctionDef::new("d2:zpvc", Arity::new(1, None), &[RawValue], NUMERIC, zpvc));
}

fn condition(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    Ok(format!(
        "case when ({}) then {} else {} end",
        call.value(0)?,
        call.value(1)?,
        call.value(2)?
    ))
}

/// Count of the item's non-null values over the enrollment's events matching `predicate`
fn count_subselect(cx: &CompilationContext<'_>, item: &ResolvedItem, predicate: &str) -> Result<String> {
    let table = cx.event_table();
    let column = item.column();
    let boundaries = event_date_conditions(cx.request)?;
    let stage = item.stage.as_deref().unwrap_or_default();

    Ok(format!(
        "(select count({column}) from {table} where {table}.pi = {alias}.pi and {column} is not null and {predicate}{boundaries} and ps = '{stage}')",
        alias = cx.table_alias(),
    ))
}

fn count(cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    let (item, _) = call.item(0)?;
    count_subselect(cx, item, &format!("{} is not null", item.column()))
}

fn count_if_condition(cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    let (item, _) = call.item(0)?;
    let Some(Arg::Comparison { op, operand }) = call.args.get(1) else {
        return Err(call.invalid("argument 2 must be a comparison string"));
    };
    count_subselect(cx, item, &format!("{} {op} {operand}", item.column()))
}

fn count_if_value(cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    let (item, _) = call.item(0)?;
    count_subselect(cx, item, &format!("{} = {}", item.column(), call.value(1)?))
}

fn days_between(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    let (start, end) = (call.value(0)?, call.value(1)?);
    Ok(format!("(cast({end} as date) - cast({start} as date))"))
}

fn weeks_between(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    let (start, end) = (call.value(0)?, call.value(1)?);
    Ok(format!("((cast({end} as date) - cast({start} as date))/7)"))
}

fn months_between(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    let (start, end) = (call.value(0)?, call.value(1)?);
    let age = format!("age(cast({end} as date), cast({start} as date))");
    Ok(format!(
        "((date_part('year',{age})) * 12 + date_part('month',{age}))"
    ))
}

fn years_between(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    let (start, end) = (call.value(0)?, call.value(1)?);
    Ok(format!(
        "(date_part('year',age(cast({end} as date), cast({start} as date))))"
    ))
}

fn minutes_between(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    let (start, end) = (call.value(0)?, call.value(1)?);
    Ok(format!(
        "(extract(epoch from (cast({end} as timestamp) - cast({start} as timestamp))) / 60)"
    ))
}

fn has_value(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    Ok(format!("({} is not null)", call.value(0)?))
}

fn extreme_value(cx: &CompilationContext<'_>, call: &Call<'_, String>, aggregate: &str) -> Result<String> {
    let (item, _) = call.item(0)?;
    let column = item.quoted_column();

    match cx.analytics_type() {
        AnalyticsType::Event => Ok(column),
        AnalyticsType::Enrollment => {
            let table = cx.event_table();
            let boundaries = event_date_conditions(cx.request)?;
            let stage = item.stage.as_deref().unwrap_or_default();
            Ok(format!(
                "(select {aggregate}({column}) from {table} where {table}.pi = {alias}.pi{boundaries} and ps = '{stage}')",
                alias = cx.table_alias(),
            ))
        }
    }
}

fn max_value(cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    extreme_value(cx, call, "max")
}

fn min_value(cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    extreme_value(cx, call, "min")
}

fn oizp(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    Ok(format!(
        "coalesce(case when {} >= 0 then 1 else 0 end, 0)",
        call.value(0)?
    ))
}

fn relationship_count(cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    let type_join = call
        .args
        .first()
        .and_then(Arg::text)
        .map(|uid| {
            format!(
                " join relationshiptype rt on r.relationshiptypeid = rt.relationshiptypeid and rt.uid = '{uid}'"
            )
        })
        .unwrap_or_default();

    Ok(format!(
        "(select count(*) from relationship r{type_join} join relationshipitem rifrom on rifrom.relationshipid = r.relationshipid join trackedentityinstance tei on rifrom.trackedentityinstanceid = tei.trackedentityinstanceid and tei.uid = {}.tei)",
        cx.table_alias()
    ))
}

fn describe_relationship_type(call: &Call<'_, ()>) -> Vec<(Span, String)> {
    call.args
        .iter()
        .filter_map(|arg| match arg {
            Arg::Text {
                span,
                display: Some(name),
                ..
            } => Some((*span, name.clone())),
            _ => None,
        })
        .collect()
}

fn zing(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    let value = call.value(0)?;
    Ok(format!(
        "coalesce(case when {value} < 0 then 0 else {value} end, 0)"
    ))
}

fn zpvc(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    let terms: Vec<_> = call
        .values()
        .map(|value| format!("case when {value} >= 0 then 1 else 0 end"))
        .collect();
    Ok(format!(
        "nullif(cast(({}) as double precision),0)",
        terms.join(" + ")
    ))
}
