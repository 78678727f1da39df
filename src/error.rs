use crate::schema::types::SchemaError;
use std::fmt;
use std::io;

/// Unified error type for the entire engine.
///
/// Synchronous mutations and single-entry saves surface storage failures
/// through this type; background tasks treat them as retryable instead.
#[derive(Debug)]
pub enum BlueprintDbError {
    /// Errors related to schema operations
    Schema(SchemaError),

    /// Errors related to database operations
    Database(String),

    /// Errors related to IO operations
    Io(io::Error),

    /// Errors related to serialization/deserialization
    Serialization(String),

    /// Other errors that don't fit into the above categories
    Other(String),
}

impl fmt::Display for BlueprintDbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(err) => write!(f, "Schema error: {}", err),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Self::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BlueprintDbError {}

impl From<SchemaError> for BlueprintDbError {
    fn from(error: SchemaError) -> Self {
        BlueprintDbError::Schema(error)
    }
}

impl From<io::Error> for BlueprintDbError {
    fn from(error: io::Error) -> Self {
        BlueprintDbError::Io(error)
    }
}

impl From<serde_json::Error> for BlueprintDbError {
    fn from(error: serde_json::Error) -> Self {
        BlueprintDbError::Serialization(error.to_string())
    }
}

impl From<sled::Error> for BlueprintDbError {
    fn from(error: sled::Error) -> Self {
        BlueprintDbError::Database(error.to_string())
    }
}

/// Result type alias for operations that can result in a BlueprintDbError
pub type BlueprintDbResult<T> = Result<T, BlueprintDbError>;
