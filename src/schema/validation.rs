//! Schema-integrity validation.
//!
//! Everything here rejects synchronously at the mutation call; the stored
//! blueprint is never left half-changed.

use crate::schema::core::SchemaCore;
use crate::schema::types::{DataType, Path, SchemaError};

/// Flags that make no sense together are rejected before a path is stored.
pub(crate) fn validate_path_flags(path: &Path) -> Result<(), SchemaError> {
    if path.data_type == DataType::Blueprint && path.is_indexed {
        return Err(SchemaError::InvalidField(format!(
            "Path '{}' has type blueprint and cannot be indexed; index its embedded fields instead",
            path.full_path
        )));
    }
    if path.embedded_blueprint_id.is_some() && path.data_type != DataType::Blueprint {
        return Err(SchemaError::InvalidField(format!(
            "Path '{}' has an embedding target but is not of type blueprint",
            path.full_path
        )));
    }
    Ok(())
}

impl SchemaCore {
    /// Rejects a new dependency edge `host -> dependency` if it would close
    /// a cycle, i.e. if the dependency already (transitively) depends on the
    /// host through attachments or embeddings.
    pub(crate) fn ensure_no_dependency_cycle(
        &self,
        host_id: &str,
        dependency_id: &str,
    ) -> Result<(), SchemaError> {
        if host_id == dependency_id {
            return Err(SchemaError::EmbeddingCycle(format!(
                "Blueprint {} cannot embed itself",
                host_id
            )));
        }

        let blueprints = self.lock_blueprints()?;
        let mut stack = vec![dependency_id.to_string()];
        let mut seen = std::collections::HashSet::new();

        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if current == host_id {
                return Err(SchemaError::EmbeddingCycle(format!(
                    "Attaching or embedding {} into {} would create a cycle",
                    dependency_id, host_id
                )));
            }
            if let Some(blueprint) = blueprints.get(&current) {
                stack.extend(blueprint.dependency_ids());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_blueprint_path_is_rejected() {
        let path = Path::new("author", DataType::Blueprint).with_indexed(true);
        assert!(matches!(
            validate_path_flags(&path),
            Err(SchemaError::InvalidField(_))
        ));
    }

    #[test]
    fn embedding_target_on_scalar_path_is_rejected() {
        let mut path = Path::new("title", DataType::String);
        path.embedded_blueprint_id = Some("bp-1".to_string());
        assert!(matches!(
            validate_path_flags(&path),
            Err(SchemaError::InvalidField(_))
        ));
    }

    #[test]
    fn plain_paths_validate() {
        let path = Path::new("title", DataType::String).with_indexed(true);
        assert!(validate_path_flags(&path).is_ok());
    }
}
