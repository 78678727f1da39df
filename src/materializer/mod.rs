//! Materialization of component attachments and embedded blueprints.
//!
//! Pure functions over [`Blueprint`](crate::schema::types::Blueprint) values;
//! persistence, cache invalidation and cascading live in the schema core.

mod component;
mod embedding;

pub use component::{dematerialize_component, materialize_component};
pub use embedding::{dematerialize_embedding, materialize_embedding};

/// Counts of what one materialization pass changed. All zero means the pass
/// was a no-op, which is what idempotency requires on unchanged sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeOutcome {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

impl MaterializeOutcome {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.removed == 0
    }
}
