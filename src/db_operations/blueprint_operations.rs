use super::DbOperations;
use crate::schema::types::{Blueprint, SchemaError};

impl DbOperations {
    /// Persists a blueprint definition, overwriting any previous version.
    pub fn store_blueprint(&self, blueprint: &Blueprint) -> Result<(), SchemaError> {
        self.store_in_tree(&self.blueprints_tree, &blueprint.id, blueprint)
    }

    pub fn get_blueprint(&self, blueprint_id: &str) -> Result<Option<Blueprint>, SchemaError> {
        self.get_from_tree(&self.blueprints_tree, blueprint_id)
    }

    pub fn delete_blueprint(&self, blueprint_id: &str) -> Result<bool, SchemaError> {
        self.delete_from_tree(&self.blueprints_tree, blueprint_id)
    }

    /// All persisted blueprints, used to warm the in-memory map on startup.
    pub fn list_blueprints(&self) -> Result<Vec<Blueprint>, SchemaError> {
        Ok(self
            .list_items_in_tree::<Blueprint>(&self.blueprints_tree)?
            .into_iter()
            .map(|(_, bp)| bp)
            .collect())
    }
}
