//! Output modes for the visitor

use crate::context::CompilationContext;
use crate::functions::{Call, FunctionDef, ReturnType};
use crate::items::{ItemKind, ResolvedItem, constant_sql, value_sql, wrapped_sql};
use crate::variables::ProgramVariable;
use crate::visitor::{ItemForm, OutputMode};
use indexmap::IndexMap;
use pi_expr_ast::{BinaryOp, Literal, UnaryOp};
use pi_expr_diagnostics::{Result, Span};
use pi_expr_model::{ConstantInfo, DataType};

/// Produces PostgreSQL
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlMode;

impl OutputMode for SqlMode {
    type Output = String;

    fn literal(&mut self, literal: &Literal, _span: Span) -> Result<String> {
        Ok(match literal {
            Literal::Number(n) => n.to_string(),
            Literal::String(s) => format!("'{}'", s.replace('\'', "''")),
            Literal::Boolean(b) => b.to_string(),
        })
    }

    fn item(
        &mut self,
        cx: &CompilationContext<'_>,
        item: &ResolvedItem,
        _span: Span,
        form: ItemForm,
    ) -> Result<String> {
        match form {
            ItemForm::Wrapped(expect) => wrapped_sql(cx, item, expect),
            ItemForm::Raw => value_sql(cx, item),
        }
    }

    fn constant(&mut self, constant: &ConstantInfo, _span: Span) -> Result<String> {
        Ok(constant_sql(constant))
    }

    fn variable(
        &mut self,
        cx: &CompilationContext<'_>,
        variable: ProgramVariable,
        _span: Span,
    ) -> Result<String> {
        variable.sql(cx)
    }

    fn unary(&mut self, op: UnaryOp, operand: String) -> String {
        // `--` would open a PostgreSQL line comment
        if op != UnaryOp::Not && operand.starts_with(['-', '+']) {
            return format!("{} {operand}", op.sql_prefix());
        }
        format!("{}{operand}", op.sql_prefix())
    }

    fn binary(&mut self, left: String, op: BinaryOp, right: String) -> String {
        format!("{left} {} {right}", op.sql())
    }

    fn group(&mut self, inner: String) -> String {
        format!("({inner})")
    }

    fn call(
        &mut self,
        cx: &CompilationContext<'_>,
        def: &FunctionDef,
        call: Call<'_, String>,
    ) -> Result<String> {
        (def.sql)(cx, &call)
    }
}

/// Records display names for references and splices them into the source text
#[derive(Debug, Clone, Default)]
pub struct DescriptionMode {
    replacements: Vec<(Span, String)>,
}

impl DescriptionMode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the recorded replacements to `source`. Overlapping spans keep the first.
    pub fn render(mut self, source: &str) -> String {
        self.replacements.sort_by_key(|(span, _)| (span.start, span.end));

        let mut out = String::with_capacity(source.len());
        let mut cursor = 0;
        for (span, name) in &self.replacements {
            if span.start < cursor || span.end > source.len() {
                continue;
            }
            let Some(before) = source.get(cursor..span.start) else {
                continue;
            };
            out.push_str(before);
            out.push_str(name);
            cursor = span.end;
        }
        out.push_str(source.get(cursor..).unwrap_or_default());
        out
    }
}

impl OutputMode for DescriptionMode {
    type Output = ();

    fn literal(&mut self, _literal: &Literal, _span: Span) -> Result<()> {
        Ok(())
    }

    fn item(
        &mut self,
        _cx: &CompilationContext<'_>,
        item: &ResolvedItem,
        span: Span,
        _form: ItemForm,
    ) -> Result<()> {
        self.replacements.push((span, item.name.clone()));
        Ok(())
    }

    fn constant(&mut self, constant: &ConstantInfo, span: Span) -> Result<()> {
        self.replacements.push((span, constant.name.clone()));
        Ok(())
    }

    fn variable(
        &mut self,
        _cx: &CompilationContext<'_>,
        variable: ProgramVariable,
        span: Span,
    ) -> Result<()> {
        self.replacements
            .push((span, variable.display_name().to_string()));
        Ok(())
    }

    fn unary(&mut self, _op: UnaryOp, _operand: ()) {}

    fn binary(&mut self, _left: (), _op: BinaryOp, _right: ()) {}

    fn group(&mut self, _inner: ()) {}

    fn call(
        &mut self,
        _cx: &CompilationContext<'_>,
        def: &FunctionDef,
        call: Call<'_, ()>,
    ) -> Result<()> {
        if let Some(describe) = def.describe {
            self.replacements.extend(describe(&call));
        }
        Ok(())
    }
}

/// Infers the result type of an expression
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeMode;

impl OutputMode for TypeMode {
    type Output = DataType;

    fn literal(&mut self, literal: &Literal, _span: Span) -> Result<DataType> {
        Ok(match literal {
            Literal::Number(_) => DataType::Numeric,
            Literal::String(_) => DataType::Text,
            Literal::Boolean(_) => DataType::Boolean,
        })
    }

    fn item(
        &mut self,
        cx: &CompilationContext<'_>,
        item: &ResolvedItem,
        _span: Span,
        form: ItemForm,
    ) -> Result<DataType> {
        let data_type = item.data_type();
        Ok(match form {
            ItemForm::Wrapped(expect)
                if data_type == DataType::Boolean
                    && expect != DataType::Boolean
                    && !cx.request.respect_missing_values =>
            {
                DataType::Numeric
            }
            _ => data_type,
        })
    }

    fn constant(&mut self, _constant: &ConstantInfo, _span: Span) -> Result<DataType> {
        Ok(DataType::Numeric)
    }

    fn variable(
        &mut self,
        _cx: &CompilationContext<'_>,
        variable: ProgramVariable,
        _span: Span,
    ) -> Result<DataType> {
        Ok(variable.data_type())
    }

    fn unary(&mut self, op: UnaryOp, operand: DataType) -> DataType {
        match op {
            UnaryOp::Not => DataType::Boolean,
            UnaryOp::Plus | UnaryOp::Negate => operand,
        }
    }

    fn binary(&mut self, _left: DataType, op: BinaryOp, _right: DataType) -> DataType {
        if op.is_comparison() || op.is_logical() {
            DataType::Boolean
        } else {
            DataType::Numeric
        }
    }

    fn group(&mut self, inner: DataType) -> DataType {
        inner
    }

    fn call(
        &mut self,
        _cx: &CompilationContext<'_>,
        def: &FunctionDef,
        call: Call<'_, DataType>,
    ) -> Result<DataType> {
        Ok(match def.returns {
            ReturnType::Fixed(data_type) => data_type,
            ReturnType::SameAs(index) => call
                .args
                .get(index)
                .and_then(|arg| arg.output().copied())
                .unwrap_or(DataType::Numeric),
        })
    }
}

/// First pass: collects referenced data elements and attributes in order of appearance
#[derive(Debug, Clone, Default)]
pub struct CollectMode {
    items: IndexMap<String, ResolvedItem>,
}

impl CollectMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_items(self) -> IndexMap<String, ResolvedItem> {
        self.items
    }
}

impl OutputMode for CollectMode {
    type Output = ();

    fn literal(&mut self, _literal: &Literal, _span: Span) -> Result<()> {
        Ok(())
    }

    fn item(
        &mut self,
        _cx: &CompilationContext<'_>,
        item: &ResolvedItem,
        _span: Span,
        _form: ItemForm,
    ) -> Result<()> {
        if matches!(item.kind, ItemKind::DataElement | ItemKind::Attribute) {
            self.items
                .entry(item.key())
                .or_insert_with(|| item.clone());
        }
        Ok(())
    }

    fn constant(&mut self, _constant: &ConstantInfo, _span: Span) -> Result<()> {
        Ok(())
    }

    fn variable(
        &mut self,
        _cx: &CompilationContext<'_>,
        _variable: ProgramVariable,
        _span: Span,
    ) -> Result<()> {
        Ok(())
    }

    fn unary(&mut self, _op: UnaryOp, _operand: ()) {}

    fn binary(&mut self, _left: (), _op: BinaryOp, _right: ()) {}

    fn group(&mut self, _inner: ()) {}

    fn call(
        &mut self,
        _cx: &CompilationContext<'_>,
        _def: &FunctionDef,
        _call: Call<'_, ()>,
    ) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_splices_in_order() {
        let mut mode = DescriptionMode::new();
        mode.replacements.push((Span::new(21, 37), "Incident date".into()));
        mode.replacements.push((Span::new(2, 20), "Enrollment date".into()));

        assert_eq!(
            mode.render("( V{enrollment_date} V{incident_date} )"),
            "( Enrollment date Incident date )"
        );
    }

    #[test]
    fn test_render_skips_overlaps() {
        let mut mode = DescriptionMode::new();
        mode.replacements.push((Span::new(0, 5), "first".into()));
        mode.replacements.push((Span::new(3, 8), "second".into()));
        assert_eq!(mode.render("abcdefghij"), "firstfghij");
    }

    #[test]
    fn test_string_literal_escaping() {
        let sql = SqlMode
            .literal(&Literal::string("it's"), Span::default())
            .unwrap();
        assert_eq!(sql, "'it''s'");
    }
}
