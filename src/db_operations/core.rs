use crate::schema::types::SchemaError;
use serde::{de::DeserializeOwned, Serialize};

/// Unified access to every persistent tree the engine touches.
///
/// Wraps a single sled database and caches the named trees: blueprint
/// definitions, content entries, the two typed index-row tables and the
/// persisted reindex queue state.
#[derive(Clone)]
pub struct DbOperations {
    /// The underlying sled database instance
    db: sled::Db,
    pub(crate) blueprints_tree: sled::Tree,
    pub(crate) entries_tree: sled::Tree,
    pub(crate) doc_values_tree: sled::Tree,
    pub(crate) doc_refs_tree: sled::Tree,
    pub(crate) queue_state_tree: sled::Tree,
}

impl DbOperations {
    /// Creates a new DbOperations instance with all required trees
    pub fn new(db: sled::Db) -> Result<Self, sled::Error> {
        let blueprints_tree = db.open_tree("blueprints")?;
        let entries_tree = db.open_tree("entries")?;
        let doc_values_tree = db.open_tree("doc_values")?;
        let doc_refs_tree = db.open_tree("doc_refs")?;
        let queue_state_tree = db.open_tree("queue_state")?;

        Ok(Self {
            db,
            blueprints_tree,
            entries_tree,
            doc_values_tree,
            doc_refs_tree,
            queue_state_tree,
        })
    }

    /// Gets a reference to the underlying database
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    /// Generic function to store any serializable item in a specific tree
    pub fn store_in_tree<T: Serialize>(
        &self,
        tree: &sled::Tree,
        key: &str,
        item: &T,
    ) -> Result<(), SchemaError> {
        let bytes = serde_json::to_vec(item)
            .map_err(|e| SchemaError::InvalidData(format!("Serialization failed: {}", e)))?;

        tree.insert(key.as_bytes(), bytes)
            .map_err(|e| SchemaError::InvalidData(format!("Store failed: {}", e)))?;

        tree.flush()
            .map_err(|e| SchemaError::InvalidData(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    /// Generic function to retrieve any deserializable item from a specific tree
    pub fn get_from_tree<T: DeserializeOwned>(
        &self,
        tree: &sled::Tree,
        key: &str,
    ) -> Result<Option<T>, SchemaError> {
        match tree.get(key.as_bytes()) {
            Ok(Some(bytes)) => {
                let item = serde_json::from_slice(&bytes).map_err(|e| {
                    SchemaError::InvalidData(format!("Deserialization failed: {}", e))
                })?;
                Ok(Some(item))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(SchemaError::InvalidData(format!("Retrieval failed: {}", e))),
        }
    }

    /// Delete an item from a specific tree
    pub fn delete_from_tree(&self, tree: &sled::Tree, key: &str) -> Result<bool, SchemaError> {
        let existed = tree
            .remove(key.as_bytes())
            .map_err(|e| SchemaError::InvalidData(format!("Delete failed: {}", e)))?
            .is_some();

        tree.flush()
            .map_err(|e| SchemaError::InvalidData(format!("Flush failed: {}", e)))?;

        Ok(existed)
    }

    /// List all key-value pairs in a tree
    pub fn list_items_in_tree<T: DeserializeOwned>(
        &self,
        tree: &sled::Tree,
    ) -> Result<Vec<(String, T)>, SchemaError> {
        let mut items = Vec::new();
        for result in tree.iter() {
            let (key, value) = result
                .map_err(|e| SchemaError::InvalidData(format!("Tree iteration failed: {}", e)))?;
            let key_str = String::from_utf8_lossy(&key).to_string();
            let item = serde_json::from_slice(&value).map_err(|e| {
                SchemaError::InvalidData(format!(
                    "Deserialization failed for key '{}': {}",
                    key_str, e
                ))
            })?;
            items.push((key_str, item));
        }
        Ok(items)
    }

    /// Keys in a tree matching a prefix, in lexicographic order.
    pub fn keys_with_prefix(
        &self,
        tree: &sled::Tree,
        prefix: &str,
    ) -> Result<Vec<Vec<u8>>, SchemaError> {
        let mut keys = Vec::new();
        for result in tree.scan_prefix(prefix.as_bytes()) {
            let (key, _) = result
                .map_err(|e| SchemaError::InvalidData(format!("Failed to scan prefix: {}", e)))?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }
}
