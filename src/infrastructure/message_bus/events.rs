//! Event type definitions and unified Event enum.
//!
//! Events are notifications, not the control path: schema mutations invoke
//! the cascade and the indexing engine directly, then publish here so
//! observers (metrics, tests, operational tooling) can watch the engine work.

use serde::{Deserialize, Serialize};

/// Trait for types that can be used as events in the message bus
pub trait EventType: Clone + Send + 'static {
    /// Get the unique type identifier for this event type
    fn type_id() -> &'static str;
}

/// A blueprint's field set changed shape: path added/removed/retyped,
/// component attached/detached, or an embedding target switched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructureChanged {
    pub blueprint_id: String,
    /// The operation that triggered the change, for log correlation.
    pub source: String,
}

/// A full-schema reindex task was placed on the background queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReindexSchemaRequested {
    pub blueprint_id: String,
}

/// A single-entry reindex task was placed on the background queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReindexEntryRequested {
    pub entry_id: String,
}

/// An entry's index rows were replaced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryIndexed {
    pub entry_id: String,
    pub blueprint_id: String,
    pub value_rows: usize,
    pub ref_rows: usize,
}

/// A structure-change cascade finished walking the dependent graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CascadeCompleted {
    pub origin_blueprint_id: String,
    pub visited: Vec<String>,
    pub failed: Vec<String>,
}

/// A background reindex task exhausted its retries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReindexTaskFailed {
    pub task_key: String,
    pub error: String,
}

impl EventType for StructureChanged {
    fn type_id() -> &'static str {
        "StructureChanged"
    }
}

impl EventType for ReindexSchemaRequested {
    fn type_id() -> &'static str {
        "ReindexSchemaRequested"
    }
}

impl EventType for ReindexEntryRequested {
    fn type_id() -> &'static str {
        "ReindexEntryRequested"
    }
}

impl EventType for EntryIndexed {
    fn type_id() -> &'static str {
        "EntryIndexed"
    }
}

impl EventType for CascadeCompleted {
    fn type_id() -> &'static str {
        "CascadeCompleted"
    }
}

impl EventType for ReindexTaskFailed {
    fn type_id() -> &'static str {
        "ReindexTaskFailed"
    }
}

/// Unified event enumeration that encompasses all event types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    StructureChanged(StructureChanged),
    ReindexSchemaRequested(ReindexSchemaRequested),
    ReindexEntryRequested(ReindexEntryRequested),
    EntryIndexed(EntryIndexed),
    CascadeCompleted(CascadeCompleted),
    ReindexTaskFailed(ReindexTaskFailed),
}

impl Event {
    /// Get the event type as a string identifier
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::StructureChanged(_) => "StructureChanged",
            Event::ReindexSchemaRequested(_) => "ReindexSchemaRequested",
            Event::ReindexEntryRequested(_) => "ReindexEntryRequested",
            Event::EntryIndexed(_) => "EntryIndexed",
            Event::CascadeCompleted(_) => "CascadeCompleted",
            Event::ReindexTaskFailed(_) => "ReindexTaskFailed",
        }
    }
}
