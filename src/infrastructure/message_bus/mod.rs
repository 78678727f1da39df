//! Internal message bus.
//!
//! A typed pub/sub layer used for observational notifications. The cascade
//! and the indexing engine are invoked by direct calls; the bus only lets
//! other components watch what happened.

mod error_handling;
mod events;
mod sync_bus;

pub use error_handling::{MessageBusError, MessageBusResult};
pub use events::{
    CascadeCompleted, EntryIndexed, Event, EventType, ReindexEntryRequested,
    ReindexSchemaRequested, ReindexTaskFailed, StructureChanged,
};
pub use sync_bus::{Consumer, MessageBus};
