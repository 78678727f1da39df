pub mod blueprint;
pub mod errors;
pub mod path;

pub use blueprint::{Blueprint, BlueprintKind, ComponentAttachment};
pub use errors::SchemaError;
pub use path::{Cardinality, DataType, Path};
