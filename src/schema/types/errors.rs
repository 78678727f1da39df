use std::fmt;

#[derive(Debug, Clone)]
pub enum SchemaError {
    NotFound(String),
    InvalidField(String),
    InvalidData(String),
    DuplicatePath(String),
    EmbeddingCycle(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SchemaError::NotFound(msg) => write!(f, "Blueprint not found: {}", msg),
            SchemaError::InvalidField(msg) => write!(f, "Invalid path: {}", msg),
            SchemaError::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
            SchemaError::DuplicatePath(msg) => write!(f, "Duplicate path: {}", msg),
            SchemaError::EmbeddingCycle(msg) => write!(f, "Embedding cycle: {}", msg),
        }
    }
}

impl std::error::Error for SchemaError {}
