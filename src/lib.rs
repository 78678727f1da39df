//! blueprintdb: a blueprint-driven content engine.
//!
//! Operators define content schemas ("blueprints") composed of typed fields
//! ("paths"), reuse sub-schemas through component attachments and nest
//! schemas through embedding points. Entries store one JSON payload each;
//! on every save the payload is projected into typed index rows so the
//! query layer can filter and sort over arbitrary fields. Structural schema
//! changes cascade through every dependent blueprint and re-materialize
//! their copied fields, with background reindexing keeping the rows honest.

pub mod cascade;
pub mod db_operations;
pub mod entry;
pub mod error;
pub mod indexing;
pub mod infrastructure;
pub mod materializer;
pub mod orchestration;
pub mod query;
pub mod schema;

mod blueprintdb;

pub use blueprintdb::BlueprintDb;
pub use cascade::{CascadeFailure, CascadeReport};
pub use entry::Entry;
pub use error::{BlueprintDbError, BlueprintDbResult};
pub use indexing::{DocRef, DocValue, IndexingEngine, SyncOutcome, TypedValue};
pub use query::FilterOp;
pub use schema::types::{
    Blueprint, BlueprintKind, Cardinality, ComponentAttachment, DataType, Path, SchemaError,
};
pub use schema::{PathUpdate, SchemaCore};
