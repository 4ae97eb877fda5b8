//! Resolution of bracketed references against metadata

use crate::boundary::boundary_subselect;
use crate::context::{AnalyticsType, CompilationContext};
use pi_expr_ast::ItemRef;
use pi_expr_diagnostics::{ExpressionError, ReferenceKind, Result};
use pi_expr_model::{ConstantInfo, DataType, ValueType};
use serde::{Deserialize, Serialize};

/// Column holding the event date in the event analytics table
pub const EVENT_DATE_COLUMN: &str = "executiondate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    DataElement,
    Attribute,
    /// `PS_EVENTDATE:stage`
    EventDate,
}

/// A data element, attribute or event date reference checked against metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedItem {
    pub kind: ItemKind,
    /// Element or attribute uid; the stage uid for event dates
    pub uid: String,
    /// Program stage for event-scoped items
    pub stage: Option<String>,
    /// Display name used by description mode
    pub name: String,
    pub value_type: ValueType,
}

impl ResolvedItem {
    /// Key of the item in the collected item set, unique per reference
    pub fn key(&self) -> String {
        match (&self.kind, &self.stage) {
            (ItemKind::EventDate, Some(stage)) => format!("PS_EVENTDATE:{stage}"),
            (_, Some(stage)) => format!("{stage}.{}", self.uid),
            (_, None) => self.uid.clone(),
        }
    }

    /// Column name as used in value position
    pub fn column(&self) -> String {
        match self.kind {
            ItemKind::EventDate => EVENT_DATE_COLUMN.to_string(),
            ItemKind::DataElement | ItemKind::Attribute => format!("\"{}\"", self.uid),
        }
    }

    /// Column name, always quoted; used by `d2:maxValue` and `d2:minValue`
    pub fn quoted_column(&self) -> String {
        match self.kind {
            ItemKind::EventDate => format!("\"{EVENT_DATE_COLUMN}\""),
            ItemKind::DataElement | ItemKind::Attribute => format!("\"{}\"", self.uid),
        }
    }

    pub const fn data_type(&self) -> DataType {
        self.value_type.data_type()
    }

    /// Whether the item lives on events rather than on the enrollment
    pub const fn is_event_scoped(&self) -> bool {
        matches!(self.kind, ItemKind::DataElement | ItemKind::EventDate)
    }
}

/// Outcome of resolving a reference
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Item(ResolvedItem),
    Constant(ConstantInfo),
}

fn stage_name(cx: &CompilationContext<'_>, stage: &str) -> Result<String> {
    cx.metadata
        .program_stage(stage)
        .map(|info| info.name)
        .ok_or_else(|| ExpressionError::unknown_reference(ReferenceKind::ProgramStage, stage))
}

/// Look up a reference in the metadata provider
pub fn resolve(cx: &CompilationContext<'_>, item: &ItemRef) -> Result<Resolved> {
    match item {
        ItemRef::DataElement { stage, element } => {
            let stage_display = stage_name(cx, stage)?;
            let info = cx.metadata.data_element(element).ok_or_else(|| {
                ExpressionError::unknown_reference(ReferenceKind::DataElement, element.as_str())
            })?;
            if !info.belongs_to(stage) {
                return Err(ExpressionError::unknown_reference(
                    ReferenceKind::ProgramStage,
                    format!("{stage}.{element}"),
                ));
            }
            Ok(Resolved::Item(ResolvedItem {
                kind: ItemKind::DataElement,
                uid: info.uid,
                stage: Some(stage.clone()),
                name: format!("{stage_display}.{}", info.name),
                value_type: info.value_type,
            }))
        }
        ItemRef::Attribute { attribute } => {
            let info = cx.metadata.attribute(attribute).ok_or_else(|| {
                ExpressionError::unknown_reference(ReferenceKind::Attribute, attribute.as_str())
            })?;
            Ok(Resolved::Item(ResolvedItem {
                kind: ItemKind::Attribute,
                uid: info.uid,
                stage: None,
                name: info.name,
                value_type: info.value_type,
            }))
        }
        ItemRef::Constant { constant } => cx
            .metadata
            .constant(constant)
            .map(Resolved::Constant)
            .ok_or_else(|| ExpressionError::unknown_reference(ReferenceKind::Constant, constant.as_str())),
        ItemRef::EventDate { stage } => {
            let stage_display = stage_name(cx, stage)?;
            Ok(Resolved::Item(ResolvedItem {
                kind: ItemKind::EventDate,
                uid: stage.clone(),
                stage: Some(stage.clone()),
                name: format!("Event date ({stage_display})"),
                value_type: ValueType::Date,
            }))
        }
        ItemRef::Other { prefix, body } => Err(ExpressionError::unknown_reference(
            ReferenceKind::Unsupported(prefix.clone()),
            body.as_str(),
        )),
    }
}

/// Unwrapped value SQL of an item for the request's analytics type
pub fn value_sql(cx: &CompilationContext<'_>, item: &ResolvedItem) -> Result<String> {
    match (cx.analytics_type(), item.is_event_scoped()) {
        (AnalyticsType::Enrollment, true) => {
            boundary_subselect(cx, &item.column(), item.stage.as_deref())
        }
        _ => Ok(item.column()),
    }
}

/// Value SQL with missing values replaced according to the expected type
pub fn wrapped_sql(cx: &CompilationContext<'_>, item: &ResolvedItem, expect: DataType) -> Result<String> {
    let raw = value_sql(cx, item)?;
    if cx.request.respect_missing_values {
        return Ok(raw);
    }

    Ok(match (item.data_type(), expect) {
        (DataType::Boolean, DataType::Boolean) => format!("coalesce({raw}::numeric!=0,false)"),
        (DataType::Numeric | DataType::Boolean, _) => format!("coalesce({raw}::numeric,0)"),
        (DataType::Text | DataType::Date, _) => raw,
    })
}

/// Constants are inlined as their decimal text
pub fn constant_sql(constant: &ConstantInfo) -> String {
    constant.value.to_string()
}
