//! Core schema state and shared accessors.
//!
//! `SchemaCore` owns the in-memory blueprint map and the pieces every
//! operation needs: persistence, the resolved-path cache, the message bus
//! and the background reindex queue. The mutation operations live in
//! `schema::operations`, validation in `schema::validation`, and the
//! dependent-graph walk in the `cascade` module.

use log::{info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::db_operations::DbOperations;
use crate::infrastructure::message_bus::{MessageBus, ReindexSchemaRequested};
use crate::orchestration::{ReindexQueue, ReindexTask};
use crate::schema::cache::ResolvedPathCache;
use crate::schema::types::{Blueprint, Path, SchemaError};

pub struct SchemaCore {
    /// Thread-safe storage for loaded blueprints
    pub(crate) blueprints: Mutex<HashMap<String, Blueprint>>,
    /// Unified database operations
    pub(crate) db_ops: Arc<DbOperations>,
    /// Message bus for observational notifications
    pub(crate) message_bus: Arc<MessageBus>,
    /// Memoized resolved path lists
    pub(crate) cache: ResolvedPathCache,
    /// Background reindex scheduling
    pub(crate) reindex_queue: Arc<ReindexQueue>,
}

impl SchemaCore {
    /// Creates a new SchemaCore, warming the in-memory map from persistence.
    pub fn new(
        db_ops: Arc<DbOperations>,
        message_bus: Arc<MessageBus>,
        reindex_queue: Arc<ReindexQueue>,
    ) -> Result<Self, SchemaError> {
        let mut blueprints = HashMap::new();
        for blueprint in db_ops.list_blueprints()? {
            blueprints.insert(blueprint.id.clone(), blueprint);
        }
        if !blueprints.is_empty() {
            info!("Loaded {} persisted blueprints", blueprints.len());
        }

        Ok(Self {
            blueprints: Mutex::new(blueprints),
            db_ops,
            message_bus,
            cache: ResolvedPathCache::new(),
            reindex_queue,
        })
    }

    pub(crate) fn lock_blueprints(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<String, Blueprint>>, SchemaError> {
        self.blueprints
            .lock()
            .map_err(|_| SchemaError::InvalidData("Failed to acquire blueprint lock".to_string()))
    }

    /// Retrieves a blueprint by id.
    pub fn get_blueprint(&self, blueprint_id: &str) -> Result<Blueprint, SchemaError> {
        let blueprints = self.lock_blueprints()?;
        blueprints
            .get(blueprint_id)
            .cloned()
            .ok_or_else(|| SchemaError::NotFound(blueprint_id.to_string()))
    }

    pub fn blueprint_exists(&self, blueprint_id: &str) -> Result<bool, SchemaError> {
        Ok(self.lock_blueprints()?.contains_key(blueprint_id))
    }

    /// Ids of all loaded blueprints, sorted for deterministic listings.
    pub fn list_blueprint_ids(&self) -> Result<Vec<String>, SchemaError> {
        let mut ids: Vec<String> = self.lock_blueprints()?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    /// The fully resolved live path list of a blueprint: authored paths plus
    /// every materialized copy, sorted by `full_path`. Memoized until the
    /// next structural mutation invalidates it.
    pub fn resolved_paths(&self, blueprint_id: &str) -> Result<Arc<Vec<Path>>, SchemaError> {
        if let Some(hit) = self.cache.get(blueprint_id) {
            return Ok(hit);
        }

        let mut paths: Vec<Path> = {
            let blueprints = self.lock_blueprints()?;
            let blueprint = blueprints
                .get(blueprint_id)
                .ok_or_else(|| SchemaError::NotFound(blueprint_id.to_string()))?;
            blueprint.live_paths().cloned().collect()
        };
        paths.sort_by(|a, b| a.full_path.cmp(&b.full_path));

        let resolved = Arc::new(paths);
        self.cache.store(blueprint_id, Arc::clone(&resolved));
        Ok(resolved)
    }

    pub(crate) fn persist_blueprint(&self, blueprint: &Blueprint) -> Result<(), SchemaError> {
        self.db_ops.store_blueprint(blueprint)
    }

    /// Schedules a full-schema reindex if the blueprint has entries.
    /// A sync pass always replaces the full row set, so scheduling even when
    /// no indexed path remains is what clears rows of fields that just lost
    /// their `is_indexed` flag through a cascade. Returns whether a task was
    /// enqueued.
    pub(crate) fn schedule_schema_reindex(&self, blueprint_id: &str) -> Result<bool, SchemaError> {
        if !self.db_ops.entries_exist_for_blueprint(blueprint_id)? {
            return Ok(false);
        }

        let added = self.reindex_queue.enqueue(ReindexTask::Schema {
            blueprint_id: blueprint_id.to_string(),
        })?;
        if added {
            if let Err(e) = self.message_bus.publish(ReindexSchemaRequested {
                blueprint_id: blueprint_id.to_string(),
            }) {
                warn!("Failed to publish ReindexSchemaRequested: {}", e);
            }
        }
        Ok(added)
    }
}
