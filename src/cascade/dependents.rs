use crate::schema::core::SchemaCore;
use crate::schema::types::SchemaError;

impl SchemaCore {
    /// Ids of every blueprint that directly attaches or embeds the given
    /// blueprint. Pure read, sorted for deterministic walks.
    pub fn direct_dependents(&self, blueprint_id: &str) -> Result<Vec<String>, SchemaError> {
        let blueprints = self.lock_blueprints()?;
        let mut dependents: Vec<String> = blueprints
            .values()
            .filter(|bp| bp.id != blueprint_id && bp.depends_on(blueprint_id))
            .map(|bp| bp.id.clone())
            .collect();
        dependents.sort();
        Ok(dependents)
    }
}
