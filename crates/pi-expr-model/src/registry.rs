//! In-memory metadata registry implementing MetadataProvider

use crate::provider::{
    AttributeInfo, ConstantInfo, DataElementInfo, MetadataError, MetadataProvider,
    ProgramStageInfo, RelationshipTypeInfo,
};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Serializable bundle of metadata objects
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataSet {
    pub data_elements: Vec<DataElementInfo>,
    pub program_stages: Vec<ProgramStageInfo>,
    pub attributes: Vec<AttributeInfo>,
    pub constants: Vec<ConstantInfo>,
    pub relationship_types: Vec<RelationshipTypeInfo>,
}

#[derive(Debug, Default)]
struct Tables {
    data_elements: IndexMap<String, DataElementInfo>,
    program_stages: IndexMap<String, ProgramStageInfo>,
    attributes: IndexMap<String, AttributeInfo>,
    constants: IndexMap<String, ConstantInfo>,
    relationship_types: IndexMap<String, RelationshipTypeInfo>,
}

/// Thread-safe metadata registry, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadata {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a metadata bundle
    pub fn from_set(set: MetadataSet) -> Self {
        let registry = Self::new();
        registry.extend(set);
        registry
    }

    /// Load from a JSON document shaped like [`MetadataSet`]
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        let set: MetadataSet = serde_json::from_str(json)?;
        Ok(Self::from_set(set))
    }

    /// Load from a JSON file at runtime
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self, MetadataError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Add or replace every object in the bundle
    pub fn extend(&self, set: MetadataSet) {
        let mut tables = self.tables.write();
        for de in set.data_elements {
            tables.data_elements.insert(de.uid.clone(), de);
        }
        for stage in set.program_stages {
            tables.program_stages.insert(stage.uid.clone(), stage);
        }
        for attribute in set.attributes {
            tables.attributes.insert(attribute.uid.clone(), attribute);
        }
        for constant in set.constants {
            tables.constants.insert(constant.uid.clone(), constant);
        }
        for rt in set.relationship_types {
            tables.relationship_types.insert(rt.uid.clone(), rt);
        }
    }

    pub fn with_data_element(self, info: DataElementInfo) -> Self {
        self.tables.write().data_elements.insert(info.uid.clone(), info);
        self
    }

    pub fn with_program_stage(self, info: ProgramStageInfo) -> Self {
        self.tables.write().program_stages.insert(info.uid.clone(), info);
        self
    }

    pub fn with_attribute(self, info: AttributeInfo) -> Self {
        self.tables.write().attributes.insert(info.uid.clone(), info);
        self
    }

    pub fn with_constant(self, info: ConstantInfo) -> Self {
        self.tables.write().constants.insert(info.uid.clone(), info);
        self
    }

    pub fn with_relationship_type(self, info: RelationshipTypeInfo) -> Self {
        self.tables
            .write()
            .relationship_types
            .insert(info.uid.clone(), info);
        self
    }

    /// Snapshot of the registry contents, in insertion order
    pub fn to_set(&self) -> MetadataSet {
        let tables = self.tables.read();
        MetadataSet {
            data_elements: tables.data_elements.values().cloned().collect(),
            program_stages: tables.program_stages.values().cloned().collect(),
            attributes: tables.attributes.values().cloned().collect(),
            constants: tables.constants.values().cloned().collect(),
            relationship_types: tables.relationship_types.values().cloned().collect(),
        }
    }
}

impl MetadataProvider for InMemoryMetadata {
    fn data_element(&self, uid: &str) -> Option<DataElementInfo> {
        self.tables.read().data_elements.get(uid).cloned()
    }

    fn program_stage(&self, uid: &str) -> Option<ProgramStageInfo> {
        self.tables.read().program_stages.get(uid).cloned()
    }

    fn attribute(&self, uid: &str) -> Option<AttributeInfo> {
        self.tables.read().attributes.get(uid).cloned()
    }

    fn constant(&self, uid: &str) -> Option<ConstantInfo> {
        self.tables.read().constants.get(uid).cloned()
    }

    fn relationship_type(&self, uid: &str) -> Option<RelationshipTypeInfo> {
        self.tables.read().relationship_types.get(uid).cloned()
    }
}
