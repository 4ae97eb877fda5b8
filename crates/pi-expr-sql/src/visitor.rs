//! Generic AST walk shared by every compilation mode
//!
//! The [`Visitor`] resolves references, validates function calls and prepares
//! arguments; an [`OutputMode`] decides what each node turns into. Because resolution
//! and validation live here, every mode fails on the same inputs.

use crate::context::CompilationContext;
use crate::functions::{Arg, ArgKind, Call, ComparisonOp, FunctionDef};
use crate::items::{Resolved, ResolvedItem, resolve};
use crate::variables::ProgramVariable;
use pi_expr_ast::{BinaryOp, Expression, FunctionCall, ItemRef, Literal, Spanned, UnaryOp};
use pi_expr_diagnostics::{ExpressionError, ReferenceKind, Result, Span};
use pi_expr_model::{ConstantInfo, DataType};
use pi_expr_parser::parse_at;
use smallvec::SmallVec;

/// How an item reference is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemForm {
    /// Missing values replaced according to the expected type
    Wrapped(DataType),
    /// Bare value, for functions that inspect the value itself
    Raw,
}

/// Strategy deciding what each node of the tree produces
pub trait OutputMode {
    type Output;

    fn literal(&mut self, literal: &Literal, span: Span) -> Result<Self::Output>;

    fn item(
        &mut self,
        cx: &CompilationContext<'_>,
        item: &ResolvedItem,
        span: Span,
        form: ItemForm,
    ) -> Result<Self::Output>;

    fn constant(&mut self, constant: &ConstantInfo, span: Span) -> Result<Self::Output>;

    fn variable(
        &mut self,
        cx: &CompilationContext<'_>,
        variable: ProgramVariable,
        span: Span,
    ) -> Result<Self::Output>;

    fn unary(&mut self, op: UnaryOp, operand: Self::Output) -> Self::Output;

    fn binary(&mut self, left: Self::Output, op: BinaryOp, right: Self::Output) -> Self::Output;

    fn group(&mut self, inner: Self::Output) -> Self::Output;

    fn call(
        &mut self,
        cx: &CompilationContext<'_>,
        def: &FunctionDef,
        call: Call<'_, Self::Output>,
    ) -> Result<Self::Output>;
}

/// Walks an expression tree, delegating node output to `M`
pub struct Visitor<'c, 'a, M> {
    cx: &'c CompilationContext<'a>,
    mode: M,
}

impl<'c, 'a, M: OutputMode> Visitor<'c, 'a, M> {
    pub fn new(cx: &'c CompilationContext<'a>, mode: M) -> Self {
        Self { cx, mode }
    }

    /// Visit the root with the request's expected result type
    pub fn visit_root(&mut self, expr: &Spanned<Expression>) -> Result<M::Output> {
        self.visit(expr, self.cx.request.data_type)
    }

    /// Visit a node; `expect` is the type the enclosing node needs from it
    pub fn visit(&mut self, expr: &Spanned<Expression>, expect: DataType) -> Result<M::Output> {
        match &expr.inner {
            Expression::Literal(literal) => self.mode.literal(literal, expr.span),
            Expression::Group(inner) => {
                let inner = self.visit(inner, expect)?;
                Ok(self.mode.group(inner))
            }
            Expression::BinaryOp(binary) => {
                let operand_type = if binary.op.is_logical() {
                    DataType::Boolean
                } else {
                    DataType::Numeric
                };
                let left = self.visit(&binary.left, operand_type)?;
                let right = self.visit(&binary.right, operand_type)?;
                Ok(self.mode.binary(left, binary.op, right))
            }
            Expression::UnaryOp(unary) => {
                let operand_type = match unary.op {
                    UnaryOp::Not => DataType::Boolean,
                    UnaryOp::Plus | UnaryOp::Negate => DataType::Numeric,
                };
                let operand = self.visit(&unary.operand, operand_type)?;
                Ok(self.mode.unary(unary.op, operand))
            }
            Expression::FunctionCall(call) => self.visit_call(call, expr.span),
            Expression::Item(item) => self.visit_reference(item, expr.span, ItemForm::Wrapped(expect)),
            Expression::Variable(name) => {
                let variable = ProgramVariable::resolve(name)?;
                self.mode.variable(self.cx, variable, expr.span)
            }
        }
    }

    fn visit_reference(&mut self, item: &ItemRef, span: Span, form: ItemForm) -> Result<M::Output> {
        match resolve(self.cx, item)? {
            Resolved::Item(item) => self.mode.item(self.cx, &item, span, form),
            Resolved::Constant(constant) => self.mode.constant(&constant, span),
        }
    }

    fn visit_call(&mut self, call: &FunctionCall, span: Span) -> Result<M::Output> {
        let cx = self.cx;
        let name = call.qualified_name();
        let def = cx
            .functions
            .get(&name)
            .ok_or_else(|| ExpressionError::illegal_function(&name))?;

        if !def.arity.accepts(call.args.len()) {
            return Err(ExpressionError::argument_count(
                def.name,
                def.arity,
                call.args.len(),
            ));
        }
        if call.distinct && !def.aggregate {
            return Err(ExpressionError::invalid_argument(
                def.name,
                "distinct is only allowed in aggregate functions",
            ));
        }

        log::trace!("dispatching {} with {} argument(s)", def.name, call.args.len());

        let mut args = SmallVec::with_capacity(call.args.len());
        for (index, arg) in call.args.iter().enumerate() {
            args.push(self.prepare_arg(def, def.arg_kind(index), arg)?);
        }

        let prepared = Call {
            name: def.name,
            distinct: call.distinct,
            args,
            span,
        };
        self.mode.call(cx, def, prepared)
    }

    fn prepare_arg(
        &mut self,
        def: &FunctionDef,
        kind: ArgKind,
        arg: &Spanned<Expression>,
    ) -> Result<Arg<M::Output>> {
        match kind {
            ArgKind::Value => Ok(Arg::Value(self.visit(arg, DataType::Numeric)?)),
            ArgKind::RawValue => {
                let value = match &arg.inner {
                    Expression::Item(item) => self.visit_reference(item, arg.span, ItemForm::Raw)?,
                    _ => self.visit(arg, DataType::Numeric)?,
                };
                Ok(Arg::Value(value))
            }
            ArgKind::Item => {
                let Expression::Item(reference) = &arg.inner else {
                    return Err(ExpressionError::invalid_argument(
                        def.name,
                        "expects a program stage data element or event date",
                    ));
                };
                match resolve(self.cx, reference)? {
                    Resolved::Item(item) if item.is_event_scoped() => {
                        let value = self.mode.item(self.cx, &item, arg.span, ItemForm::Raw)?;
                        Ok(Arg::Item { item, value })
                    }
                    _ => Err(ExpressionError::invalid_argument(
                        def.name,
                        format!("'{reference}' is not a program stage data element or event date"),
                    )),
                }
            }
            ArgKind::Condition => {
                let value = match arg.as_string_literal() {
                    Some(text) => {
                        let nested = parse_at(text, arg.span.start + 1, &self.cx.parser)?;
                        self.visit(&nested, DataType::Boolean)?
                    }
                    None => self.visit(arg, DataType::Boolean)?,
                };
                Ok(Arg::Value(value))
            }
            ArgKind::Comparison => {
                let text = string_argument(def, arg)?;
                let (op, offset) = ComparisonOp::split(text).ok_or_else(|| {
                    ExpressionError::invalid_argument(
                        def.name,
                        format!("'{text}' must start with one of == = != > >= < <="),
                    )
                })?;
                let nested = parse_at(&text[offset..], arg.span.start + 1 + offset, &self.cx.parser)?;
                let operand = self.visit(&nested, DataType::Numeric)?;
                Ok(Arg::Comparison { op, operand })
            }
            ArgKind::Text => Ok(Arg::Text {
                value: string_argument(def, arg)?.to_string(),
                span: inner_span(arg.span),
                display: None,
            }),
            ArgKind::RelationshipType => {
                let uid = string_argument(def, arg)?;
                let info = self.cx.metadata.relationship_type(uid).ok_or_else(|| {
                    ExpressionError::unknown_reference(ReferenceKind::RelationshipType, uid)
                })?;
                Ok(Arg::Text {
                    value: info.uid,
                    span: inner_span(arg.span),
                    display: Some(info.name),
                })
            }
        }
    }

    /// Consume the visitor, returning the mode and whatever it accumulated
    pub fn into_mode(self) -> M {
        self.mode
    }
}

fn string_argument<'e>(def: &FunctionDef, arg: &'e Spanned<Expression>) -> Result<&'e str> {
    arg.as_string_literal()
        .ok_or_else(|| ExpressionError::invalid_argument(def.name, "expects a string literal"))
}

/// Span of a string literal's content, without the quotes
fn inner_span(span: Span) -> Span {
    Span::new(span.start + 1, span.end.saturating_sub(1).max(span.start + 1))
}
