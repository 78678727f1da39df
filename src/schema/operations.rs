//! Blueprint and path mutations.
//!
//! Every structural mutation follows the same contract: validate against the
//! current state (rejecting with the record unchanged), apply, persist,
//! invalidate the resolved-path cache, publish a `StructureChanged`
//! notification and walk the dependent cascade with a fresh visited set.
//! The returned [`CascadeReport`] tells the caller which dependents were
//! re-materialized and which failed.

use log::info;
use serde_json::Value;
use std::collections::HashSet;

use crate::cascade::CascadeReport;
use crate::materializer::{
    dematerialize_component, dematerialize_embedding, materialize_component,
    materialize_embedding,
};
use crate::schema::core::SchemaCore;
use crate::schema::types::{
    Blueprint, BlueprintKind, Cardinality, ComponentAttachment, DataType, Path, SchemaError,
};
use crate::schema::validation::validate_path_flags;

/// Partial update for a path. `validation_rules` is doubly optional so the
/// rules can be cleared explicitly.
#[derive(Debug, Clone, Default)]
pub struct PathUpdate {
    pub data_type: Option<DataType>,
    pub cardinality: Option<Cardinality>,
    pub is_indexed: Option<bool>,
    pub is_required: Option<bool>,
    pub validation_rules: Option<Option<Value>>,
}

impl SchemaCore {
    pub fn create_blueprint(
        &self,
        name: &str,
        kind: BlueprintKind,
    ) -> Result<Blueprint, SchemaError> {
        let blueprint = Blueprint::new(name, kind);
        {
            let mut blueprints = self.lock_blueprints()?;
            blueprints.insert(blueprint.id.clone(), blueprint.clone());
        }
        self.persist_blueprint(&blueprint)?;
        info!("Created blueprint '{}' ({:?})", blueprint.name, blueprint.kind);
        Ok(blueprint)
    }

    /// Loads a fully formed blueprint, overwriting any existing definition
    /// with the same id. Checks `full_path` uniqueness but trusts the rest
    /// of the definition; external sources are responsible for their own
    /// graph shape, and the cascade tolerates whatever they bring.
    pub fn load_blueprint(&self, blueprint: Blueprint) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for path in blueprint.live_paths() {
            if !seen.insert(path.full_path.as_str()) {
                return Err(SchemaError::DuplicatePath(path.full_path.clone()));
            }
        }

        self.persist_blueprint(&blueprint)?;
        let blueprint_id = blueprint.id.clone();
        {
            let mut blueprints = self.lock_blueprints()?;
            blueprints.insert(blueprint_id.clone(), blueprint);
        }
        self.cache.invalidate(&blueprint_id);
        info!("Loaded blueprint {}", blueprint_id);
        Ok(())
    }

    /// Deletes a blueprint. Rejected while dependents or entries still
    /// reference it.
    pub fn delete_blueprint(&self, blueprint_id: &str) -> Result<(), SchemaError> {
        let dependents = self.direct_dependents(blueprint_id)?;
        if !dependents.is_empty() {
            return Err(SchemaError::InvalidData(format!(
                "Blueprint {} is still referenced by {} dependent blueprint(s)",
                blueprint_id,
                dependents.len()
            )));
        }
        if self.db_ops.entries_exist_for_blueprint(blueprint_id)? {
            return Err(SchemaError::InvalidData(format!(
                "Blueprint {} still has entries",
                blueprint_id
            )));
        }

        {
            let mut blueprints = self.lock_blueprints()?;
            blueprints
                .remove(blueprint_id)
                .ok_or_else(|| SchemaError::NotFound(blueprint_id.to_string()))?;
        }
        self.db_ops.delete_blueprint(blueprint_id)?;
        self.cache.invalidate(blueprint_id);
        info!("Deleted blueprint {}", blueprint_id);
        Ok(())
    }

    /// Adds an authored path. The `full_path` is computed from the parent;
    /// embedding targets are set separately via [`Self::set_embedding_target`].
    pub fn add_path(&self, blueprint_id: &str, mut path: Path) -> Result<CascadeReport, SchemaError> {
        if !path.is_authored() {
            return Err(SchemaError::InvalidField(
                "Materialized paths are managed by the materializer".to_string(),
            ));
        }
        if path.embedded_blueprint_id.is_some() {
            return Err(SchemaError::InvalidField(
                "Add the path first, then set its embedding target".to_string(),
            ));
        }
        if path.name.is_empty() || path.name.contains('.') {
            return Err(SchemaError::InvalidField(format!(
                "Invalid path name '{}'",
                path.name
            )));
        }
        validate_path_flags(&path)?;

        {
            let mut blueprints = self.lock_blueprints()?;
            let blueprint = blueprints
                .get_mut(blueprint_id)
                .ok_or_else(|| SchemaError::NotFound(blueprint_id.to_string()))?;

            let full_path = match &path.parent_id {
                Some(parent_id) => {
                    let parent = blueprint
                        .path(parent_id)
                        .filter(|p| p.is_live())
                        .ok_or_else(|| {
                            SchemaError::InvalidField(format!(
                                "Parent path {} not found",
                                parent_id
                            ))
                        })?;
                    if parent.is_materialized() {
                        return Err(SchemaError::InvalidField(format!(
                            "Cannot author a path under materialized path '{}'",
                            parent.full_path
                        )));
                    }
                    if parent.is_embedding_point() {
                        return Err(SchemaError::InvalidField(format!(
                            "Cannot author a path under embedding point '{}'",
                            parent.full_path
                        )));
                    }
                    format!("{}.{}", parent.full_path, path.name)
                }
                None => path.name.clone(),
            };

            if blueprint.has_live_full_path(&full_path, None) {
                return Err(SchemaError::DuplicatePath(full_path));
            }

            path.full_path = full_path;
            blueprint.paths.insert(path.id.clone(), path);
        }

        self.touch_structure(blueprint_id, "add_path")
    }

    /// Applies a partial update to an authored path. Retyping or retoggling
    /// `is_indexed` schedules a reindex of the blueprint's entries; turning
    /// `is_indexed` off additionally removes the path's existing rows.
    pub fn update_path(
        &self,
        blueprint_id: &str,
        path_id: &str,
        update: PathUpdate,
    ) -> Result<CascadeReport, SchemaError> {
        let index_turned_off;
        {
            let mut blueprints = self.lock_blueprints()?;
            let blueprint = blueprints
                .get_mut(blueprint_id)
                .ok_or_else(|| SchemaError::NotFound(blueprint_id.to_string()))?;
            let path = blueprint
                .path(path_id)
                .filter(|p| p.is_live())
                .ok_or_else(|| SchemaError::InvalidField(format!("Path {} not found", path_id)))?;
            if path.is_materialized() {
                return Err(SchemaError::InvalidField(format!(
                    "Path '{}' is materialized; edit its source instead",
                    path.full_path
                )));
            }

            let mut updated = path.clone();
            if let Some(data_type) = update.data_type {
                updated.data_type = data_type;
            }
            if let Some(cardinality) = update.cardinality {
                updated.cardinality = cardinality;
            }
            if let Some(is_indexed) = update.is_indexed {
                updated.is_indexed = is_indexed;
            }
            if let Some(is_required) = update.is_required {
                updated.is_required = is_required;
            }
            if let Some(validation_rules) = update.validation_rules {
                updated.validation_rules = validation_rules;
            }
            validate_path_flags(&updated)?;

            index_turned_off = path.is_indexed && !updated.is_indexed;
            *blueprint
                .path_mut(path_id)
                .ok_or_else(|| SchemaError::InvalidField(format!("Path {} not found", path_id)))? =
                updated;
        }

        if index_turned_off {
            let removed = self.db_ops.delete_rows_for_path(path_id)?;
            info!(
                "Removed {} index rows after un-indexing path {}",
                removed, path_id
            );
        }

        self.touch_structure(blueprint_id, "update_path")
    }

    /// Renames an authored path, propagating the new `full_path` to every
    /// descendant (including materialized copies under an embedding point in
    /// the renamed subtree).
    pub fn rename_path(
        &self,
        blueprint_id: &str,
        path_id: &str,
        new_name: &str,
    ) -> Result<CascadeReport, SchemaError> {
        if new_name.is_empty() || new_name.contains('.') {
            return Err(SchemaError::InvalidField(format!(
                "Invalid path name '{}'",
                new_name
            )));
        }

        {
            let mut blueprints = self.lock_blueprints()?;
            let blueprint = blueprints
                .get_mut(blueprint_id)
                .ok_or_else(|| SchemaError::NotFound(blueprint_id.to_string()))?;
            let path = blueprint
                .path(path_id)
                .filter(|p| p.is_live())
                .ok_or_else(|| SchemaError::InvalidField(format!("Path {} not found", path_id)))?;
            if path.is_materialized() {
                return Err(SchemaError::InvalidField(format!(
                    "Path '{}' is materialized; rename its source instead",
                    path.full_path
                )));
            }

            let old_full = path.full_path.clone();
            let new_full = match &path.parent_id {
                Some(parent_id) => {
                    let parent = blueprint.path(parent_id).ok_or_else(|| {
                        SchemaError::InvalidField(format!("Parent path {} not found", parent_id))
                    })?;
                    format!("{}.{}", parent.full_path, new_name)
                }
                None => new_name.to_string(),
            };

            let subtree_prefix = format!("{}.", old_full);
            let renames: Vec<(String, String)> = blueprint
                .live_paths()
                .filter_map(|p| {
                    if p.id == path_id {
                        Some((p.id.clone(), new_full.clone()))
                    } else if p.full_path.starts_with(&subtree_prefix) {
                        Some((
                            p.id.clone(),
                            format!("{}{}", new_full, &p.full_path[old_full.len()..]),
                        ))
                    } else {
                        None
                    }
                })
                .collect();

            let rename_ids: HashSet<&str> = renames.iter().map(|(id, _)| id.as_str()).collect();
            for (_, new_full_path) in &renames {
                if blueprint
                    .live_paths()
                    .any(|q| !rename_ids.contains(q.id.as_str()) && q.full_path == *new_full_path)
                {
                    return Err(SchemaError::DuplicatePath(new_full_path.clone()));
                }
            }

            for (id, new_full_path) in renames {
                if let Some(p) = blueprint.path_mut(&id) {
                    p.full_path = new_full_path;
                }
            }
            if let Some(p) = blueprint.path_mut(path_id) {
                p.name = new_name.to_string();
            }
        }

        self.touch_structure(blueprint_id, "rename_path")
    }

    /// Removes an authored path together with its subtree (descendants and
    /// any materialized copies living under it), and drops their index rows.
    pub fn remove_path(&self, blueprint_id: &str, path_id: &str) -> Result<CascadeReport, SchemaError> {
        let removed_ids;
        {
            let mut blueprints = self.lock_blueprints()?;
            let blueprint = blueprints
                .get_mut(blueprint_id)
                .ok_or_else(|| SchemaError::NotFound(blueprint_id.to_string()))?;
            let path = blueprint
                .path(path_id)
                .ok_or_else(|| SchemaError::InvalidField(format!("Path {} not found", path_id)))?;
            if path.is_materialized() {
                return Err(SchemaError::InvalidField(format!(
                    "Path '{}' is materialized; detach its component or embedding instead",
                    path.full_path
                )));
            }

            let subtree_prefix = format!("{}.", path.full_path);
            removed_ids = blueprint
                .paths
                .values()
                .filter(|p| p.id == path_id || p.full_path.starts_with(&subtree_prefix))
                .map(|p| p.id.clone())
                .collect::<Vec<String>>();
            for id in &removed_ids {
                blueprint.paths.remove(id);
            }
        }

        for id in &removed_ids {
            self.db_ops.delete_rows_for_path(id)?;
        }

        self.touch_structure(blueprint_id, "remove_path")
    }

    /// Attaches a component to a host, materializing its fields under the
    /// given prefix.
    pub fn attach_component(
        &self,
        host_id: &str,
        component_id: &str,
        path_prefix: &str,
    ) -> Result<CascadeReport, SchemaError> {
        if path_prefix.trim().is_empty() {
            return Err(SchemaError::InvalidData(
                "Attachment path prefix must not be empty".to_string(),
            ));
        }

        let component = {
            let blueprints = self.lock_blueprints()?;
            let component = blueprints
                .get(component_id)
                .ok_or_else(|| SchemaError::NotFound(component_id.to_string()))?;
            if component.kind != BlueprintKind::Component {
                return Err(SchemaError::InvalidData(format!(
                    "Blueprint '{}' is not a component and cannot be attached",
                    component.name
                )));
            }
            component.clone()
        };

        self.ensure_no_dependency_cycle(host_id, component_id)?;

        {
            let mut blueprints = self.lock_blueprints()?;
            let host = blueprints
                .get_mut(host_id)
                .ok_or_else(|| SchemaError::NotFound(host_id.to_string()))?;
            if host.attachment(component_id).is_some() {
                return Err(SchemaError::InvalidData(format!(
                    "Component '{}' is already attached to '{}'",
                    component.name, host.name
                )));
            }

            let mut updated = host.clone();
            updated.attachments.push(ComponentAttachment {
                component_id: component_id.to_string(),
                path_prefix: path_prefix.to_string(),
            });
            materialize_component(&mut updated, &component, path_prefix)?;
            *host = updated;
        }

        self.touch_structure(host_id, "attach_component")
    }

    /// Detaches a component, tombstoning its materialized copies and
    /// removing their index rows.
    pub fn detach_component(
        &self,
        host_id: &str,
        component_id: &str,
    ) -> Result<CascadeReport, SchemaError> {
        let tombstoned_ids;
        {
            let mut blueprints = self.lock_blueprints()?;
            let host = blueprints
                .get_mut(host_id)
                .ok_or_else(|| SchemaError::NotFound(host_id.to_string()))?;
            if host.attachment(component_id).is_none() {
                return Err(SchemaError::InvalidData(format!(
                    "Component {} is not attached to {}",
                    component_id, host_id
                )));
            }

            let mut updated = host.clone();
            updated.attachments.retain(|a| a.component_id != component_id);
            tombstoned_ids = updated
                .paths
                .values()
                .filter(|p| {
                    p.is_live() && p.source_component_id.as_deref() == Some(component_id)
                })
                .map(|p| p.id.clone())
                .collect::<Vec<String>>();
            dematerialize_component(&mut updated, component_id);
            *host = updated;
        }

        for id in &tombstoned_ids {
            self.db_ops.delete_rows_for_path(id)?;
        }

        self.touch_structure(host_id, "detach_component")
    }

    /// Points an embedding path at a target blueprint (or clears it),
    /// re-materializing the copies it projects into the host.
    pub fn set_embedding_target(
        &self,
        blueprint_id: &str,
        path_id: &str,
        target_id: Option<&str>,
    ) -> Result<CascadeReport, SchemaError> {
        match target_id {
            Some(target_id) => {
                self.ensure_no_dependency_cycle(blueprint_id, target_id)?;
                let target_resolved = self.resolved_paths(target_id)?;

                let mut blueprints = self.lock_blueprints()?;
                let blueprint = blueprints
                    .get_mut(blueprint_id)
                    .ok_or_else(|| SchemaError::NotFound(blueprint_id.to_string()))?;
                let path = blueprint
                    .path(path_id)
                    .filter(|p| p.is_live())
                    .ok_or_else(|| {
                        SchemaError::InvalidField(format!("Path {} not found", path_id))
                    })?;
                if path.is_materialized() {
                    return Err(SchemaError::InvalidField(format!(
                        "Path '{}' is materialized and cannot embed",
                        path.full_path
                    )));
                }
                if path.data_type != DataType::Blueprint {
                    return Err(SchemaError::InvalidField(format!(
                        "Path '{}' must have type blueprint to embed",
                        path.full_path
                    )));
                }

                let mut updated = blueprint.clone();
                let retargeted = updated
                    .path(path_id)
                    .and_then(|p| p.embedded_blueprint_id.as_deref())
                    .is_some_and(|current| current != target_id);
                if retargeted {
                    dematerialize_embedding(&mut updated, path_id);
                }
                if let Some(p) = updated.path_mut(path_id) {
                    p.embedded_blueprint_id = Some(target_id.to_string());
                }
                materialize_embedding(&mut updated, path_id, &target_resolved)?;
                *blueprint = updated;
                drop(blueprints);

                self.touch_structure(blueprint_id, "set_embedding_target")
            }
            None => {
                let tombstoned_ids;
                {
                    let mut blueprints = self.lock_blueprints()?;
                    let blueprint = blueprints
                        .get_mut(blueprint_id)
                        .ok_or_else(|| SchemaError::NotFound(blueprint_id.to_string()))?;
                    blueprint
                        .path(path_id)
                        .filter(|p| p.is_live())
                        .ok_or_else(|| {
                            SchemaError::InvalidField(format!("Path {} not found", path_id))
                        })?;

                    let mut updated = blueprint.clone();
                    tombstoned_ids = updated
                        .paths
                        .values()
                        .filter(|p| {
                            p.is_live() && p.embedded_root_path_id.as_deref() == Some(path_id)
                        })
                        .map(|p| p.id.clone())
                        .collect::<Vec<String>>();
                    dematerialize_embedding(&mut updated, path_id);
                    if let Some(p) = updated.path_mut(path_id) {
                        p.embedded_blueprint_id = None;
                    }
                    *blueprint = updated;
                }

                for id in &tombstoned_ids {
                    self.db_ops.delete_rows_for_path(id)?;
                }

                self.touch_structure(blueprint_id, "clear_embedding_target")
            }
        }
    }

    /// Physically removes tombstoned paths and their leftover index rows.
    /// A maintenance pass; resolution already ignores tombstones, so no
    /// cascade is needed.
    pub fn compact_blueprint(&self, blueprint_id: &str) -> Result<usize, SchemaError> {
        let (compacted_ids, snapshot) = {
            let mut blueprints = self.lock_blueprints()?;
            let blueprint = blueprints
                .get_mut(blueprint_id)
                .ok_or_else(|| SchemaError::NotFound(blueprint_id.to_string()))?;
            let ids: Vec<String> = blueprint
                .paths
                .values()
                .filter(|p| p.tombstoned)
                .map(|p| p.id.clone())
                .collect();
            for id in &ids {
                blueprint.paths.remove(id);
            }
            (ids, blueprint.clone())
        };

        for id in &compacted_ids {
            self.db_ops.delete_rows_for_path(id)?;
        }
        self.persist_blueprint(&snapshot)?;
        self.cache.invalidate(blueprint_id);
        if !compacted_ids.is_empty() {
            info!(
                "Compacted {} tombstoned paths from blueprint {}",
                compacted_ids.len(),
                blueprint_id
            );
        }
        Ok(compacted_ids.len())
    }
}
