use super::DbOperations;
use crate::entry::Entry;
use crate::schema::types::SchemaError;

impl DbOperations {
    pub fn store_entry(&self, entry: &Entry) -> Result<(), SchemaError> {
        self.store_in_tree(&self.entries_tree, &entry.id, entry)
    }

    pub fn get_entry(&self, entry_id: &str) -> Result<Option<Entry>, SchemaError> {
        self.get_from_tree(&self.entries_tree, entry_id)
    }

    pub fn delete_entry(&self, entry_id: &str) -> Result<bool, SchemaError> {
        self.delete_from_tree(&self.entries_tree, entry_id)
    }

    /// Every entry bound to the given blueprint. A full scan; entries carry
    /// no secondary keying by blueprint.
    pub fn entries_for_blueprint(&self, blueprint_id: &str) -> Result<Vec<Entry>, SchemaError> {
        Ok(self
            .list_items_in_tree::<Entry>(&self.entries_tree)?
            .into_iter()
            .map(|(_, entry)| entry)
            .filter(|entry| entry.blueprint_id == blueprint_id)
            .collect())
    }

    pub fn entries_exist_for_blueprint(&self, blueprint_id: &str) -> Result<bool, SchemaError> {
        Ok(!self.entries_for_blueprint(blueprint_id)?.is_empty())
    }
}
