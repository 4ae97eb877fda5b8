//! Built-in functions and vector aggregates

use super::{ArgKind, Call, FunctionDef, FunctionRegistry, ReturnType};
use crate::context::CompilationContext;
use pi_expr_diagnostics::{Arity, Result};
use pi_expr_model::DataType;

const NUMERIC: ReturnType = ReturnType::Fixed(DataType::Numeric);
const BOOLEAN: ReturnType = ReturnType::Fixed(DataType::Boolean);

pub(super) fn register(registry: &mut FunctionRegistry) {
    let one = Arity::exactly(1);
    let variadic = Arity::new(1, None);

    registry.register(FunctionDef::new("avg", one, &[ArgKind::Value], NUMERIC, avg).aggregate());
    registry.register(FunctionDef::new("count", one, &[ArgKind::Value], NUMERIC, count).aggregate());
    registry.register(
        FunctionDef::new("max", one, &[ArgKind::Value], ReturnType::SameAs(0), max).aggregate(),
    );
    registry.register(
        FunctionDef::new("min", one, &[ArgKind::Value], ReturnType::SameAs(0), min).aggregate(),
    );
    registry.register(FunctionDef::new("stddev", one, &[ArgKind::Value], NUMERIC, stddev).aggregate());
    registry.register(FunctionDef::new("sum", one, &[ArgKind::Value], NUMERIC, sum).aggregate());
    registry.register(
        FunctionDef::new("variance", one, &[ArgKind::Value], NUMERIC, variance).aggregate(),
    );

    registry.register(FunctionDef::new(
        "log",
        Arity::new(1, Some(2)),
        &[ArgKind::Value],
        NUMERIC,
        log,
    ));
    registry.register(FunctionDef::new("log10", one, &[ArgKind::Value], NUMERIC, log10));

    registry.register(FunctionDef::new(
        "if",
        Arity::exactly(3),
        &[ArgKind::Condition, ArgKind::Value, ArgKind::Value],
        ReturnType::SameAs(1),
        if_then_else,
    ));
    registry.register(FunctionDef::new("isNull", one, &[ArgKind::RawValue], BOOLEAN, is_null));
    registry.register(FunctionDef::new(
        "isNotNull",
        one,
        &[ArgKind::RawValue],
        BOOLEAN,
        is_not_null,
    ));
    registry.register(FunctionDef::new(
        "firstNonNull",
        variadic,
        &[ArgKind::RawValue],
        ReturnType::SameAs(0),
        first_non_null,
    ));
    registry.register(FunctionDef::new(
        "greatest",
        variadic,
        &[ArgKind::Value],
        ReturnType::SameAs(0),
        greatest,
    ));
    registry.register(FunctionDef::new(
        "least",
        variadic,
        &[ArgKind::Value],
        ReturnType::SameAs(0),
        least,
    ));
}

/// `<function>([distinct ]<arg>)`
fn aggregate(function: &str, call: &Call<'_, String>) -> Result<String> {
    let distinct = if call.distinct { "distinct " } else { "" };
    Ok(format!("{function}({distinct}{})", call.value(0)?))
}

fn avg(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    aggregate("avg", call)
}

fn count(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    aggregate("count", call)
}

fn max(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    aggregate("max", call)
}

fn min(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    aggregate("min", call)
}

fn stddev(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    aggregate("stddev_samp", call)
}

fn sum(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    aggregate("sum", call)
}

fn variance(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    aggregate("variance", call)
}

/// Natural logarithm, or logarithm to the base given as the second argument
fn log(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    let value = call.value(0)?;
    match call.args.len() {
        1 => Ok(format!("ln({value})")),
        _ => Ok(format!("log({}, {value})", call.value(1)?)),
    }
}

fn log10(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    Ok(format!("log({})", call.value(0)?))
}

fn if_then_else(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    Ok(format!(
        "case when {} then {} else {} end",
        call.value(0)?,
        call.value(1)?,
        call.value(2)?
    ))
}

fn is_null(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    Ok(format!("{} is null", call.value(0)?))
}

fn is_not_null(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    Ok(format!("{} is not null", call.value(0)?))
}

fn joined(call: &Call<'_, String>) -> String {
    call.values().map(String::as_str).collect::<Vec<_>>().join(",")
}

fn first_non_null(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    Ok(format!("coalesce({})", joined(call)))
}

fn greatest(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    Ok(format!("greatest({})", joined(call)))
}

fn least(_cx: &CompilationContext<'_>, call: &Call<'_, String>) -> Result<String> {
    Ok(format!("least({})", joined(call)))
}
