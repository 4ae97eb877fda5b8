//! Read-only metadata lookups used during compilation

use crate::ValueType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Source of metadata for reference resolution.
///
/// Every lookup returns `None` when the uid is unknown; the compiler turns that into
/// an unknown-reference error.
pub trait MetadataProvider: Send + Sync {
    fn data_element(&self, uid: &str) -> Option<DataElementInfo>;

    fn program_stage(&self, uid: &str) -> Option<ProgramStageInfo>;

    /// Tracked entity attribute
    fn attribute(&self, uid: &str) -> Option<AttributeInfo>;

    fn constant(&self, uid: &str) -> Option<ConstantInfo>;

    fn relationship_type(&self, uid: &str) -> Option<RelationshipTypeInfo>;
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for &P {
    fn data_element(&self, uid: &str) -> Option<DataElementInfo> {
        (**self).data_element(uid)
    }

    fn program_stage(&self, uid: &str) -> Option<ProgramStageInfo> {
        (**self).program_stage(uid)
    }

    fn attribute(&self, uid: &str) -> Option<AttributeInfo> {
        (**self).attribute(uid)
    }

    fn constant(&self, uid: &str) -> Option<ConstantInfo> {
        (**self).constant(uid)
    }

    fn relationship_type(&self, uid: &str) -> Option<RelationshipTypeInfo> {
        (**self).relationship_type(uid)
    }
}

/// Data element metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataElementInfo {
    pub uid: String,
    /// Display name used by description mode
    pub name: String,
    #[serde(default)]
    pub value_type: ValueType,
    /// Program stages the element is collected in; empty means unrestricted
    #[serde(default)]
    pub stages: Vec<String>,
}

impl DataElementInfo {
    pub fn new(uid: impl Into<String>, name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            value_type,
            stages: Vec::new(),
        }
    }

    pub fn in_stage(mut self, stage: impl Into<String>) -> Self {
        self.stages.push(stage.into());
        self
    }

    /// Whether the element may be referenced through `stage`
    pub fn belongs_to(&self, stage: &str) -> bool {
        self.stages.is_empty() || self.stages.iter().any(|s| s == stage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramStageInfo {
    pub uid: String,
    pub name: String,
}

impl ProgramStageInfo {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
        }
    }
}

/// Tracked entity attribute metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeInfo {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub value_type: ValueType,
}

impl AttributeInfo {
    pub fn new(uid: impl Into<String>, name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            value_type,
        }
    }
}

/// Named numeric constant, inlined into generated SQL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantInfo {
    pub uid: String,
    pub name: String,
    pub value: Decimal,
}

impl ConstantInfo {
    pub fn new(uid: impl Into<String>, name: impl Into<String>, value: Decimal) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipTypeInfo {
    pub uid: String,
    pub name: String,
}

impl RelationshipTypeInfo {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
        }
    }
}

/// Error loading metadata documents
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("Metadata parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Metadata I/O error: {0}")]
    Io(#[from] std::io::Error),
}
