use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Concrete value type a path can hold.
///
/// The variant determines which index column a value lands in; `Ref` rows go
/// to the reference table and `Blueprint` marks an embedding point that never
/// produces rows of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    Text,
    Int,
    Float,
    Bool,
    Date,
    DateTime,
    Json,
    Ref,
    Blueprint,
}

impl DataType {
    /// Whether values of this type can be projected into index rows.
    pub fn is_indexable(self) -> bool {
        !matches!(self, DataType::Blueprint)
    }
}

/// How many values an entry may store under a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    One,
    Many,
}

/// A single typed field in a blueprint.
///
/// Paths form a tree through `parent_id`; `full_path` is the dot-joined path
/// from the root and is unique within the owning blueprint. A path is either
/// authored by an operator or derived by materialization, distinguished by
/// the back-reference columns:
///
/// - `source_component_id` + `source_path_id`: a materialized copy of a field
///   owned by an attached component.
/// - `embedded_root_path_id` (+ `source_path_id`): a copy produced by an
///   embedding point, pointing back at the embedding path.
///
/// Derived paths are managed exclusively by the materializer; direct edits to
/// them are rejected by the schema operations. Removal is a two-step affair:
/// the materializer tombstones copies and a later compaction pass deletes
/// them physically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    pub id: String,
    pub name: String,
    pub full_path: String,
    pub parent_id: Option<String>,
    pub data_type: DataType,
    pub cardinality: Cardinality,
    pub is_indexed: bool,
    pub is_required: bool,
    pub validation_rules: Option<Value>,
    /// Target blueprint when this path is an embedding point.
    pub embedded_blueprint_id: Option<String>,
    /// Set on copies produced by an embedding point.
    pub embedded_root_path_id: Option<String>,
    /// Set on copies produced by a component attachment.
    pub source_component_id: Option<String>,
    /// The authored path this copy was derived from.
    pub source_path_id: Option<String>,
    pub tombstoned: bool,
}

impl Path {
    /// Creates a new authored root-level path. `full_path` starts out equal
    /// to `name`; adding the path under a parent recomputes it.
    #[must_use]
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            full_path: name.to_string(),
            parent_id: None,
            data_type,
            cardinality: Cardinality::One,
            is_indexed: false,
            is_required: false,
            validation_rules: None,
            embedded_blueprint_id: None,
            embedded_root_path_id: None,
            source_component_id: None,
            source_path_id: None,
            tombstoned: false,
        }
    }

    #[must_use]
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    #[must_use]
    pub fn with_indexed(mut self, is_indexed: bool) -> Self {
        self.is_indexed = is_indexed;
        self
    }

    #[must_use]
    pub fn with_required(mut self, is_required: bool) -> Self {
        self.is_required = is_required;
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: &str) -> Self {
        self.parent_id = Some(parent_id.to_string());
        self
    }

    #[must_use]
    pub fn with_validation_rules(mut self, rules: Value) -> Self {
        self.validation_rules = Some(rules);
        self
    }

    /// An authored path has no materialization back-references.
    pub fn is_authored(&self) -> bool {
        self.source_component_id.is_none() && self.embedded_root_path_id.is_none()
    }

    pub fn is_materialized(&self) -> bool {
        !self.is_authored()
    }

    pub fn is_live(&self) -> bool {
        !self.tombstoned
    }

    /// Whether this path causes another blueprint's fields to be copied in.
    pub fn is_embedding_point(&self) -> bool {
        self.data_type == DataType::Blueprint && self.embedded_blueprint_id.is_some()
    }
}
