//! Document indexing: payload extraction and typed row projection.

mod engine;
pub(crate) mod extract;
pub mod rows;

pub use engine::{IndexingEngine, SyncOutcome};
pub use rows::{DocRef, DocValue, TypedValue};
