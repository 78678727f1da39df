//! The `BlueprintDb` facade: wires the schema core, indexing engine,
//! message bus and background reindex queue together, and exposes the entry
//! lifecycle that drives the indexing pipeline.

use log::{info, warn};
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::db_operations::DbOperations;
use crate::entry::Entry;
use crate::error::{BlueprintDbError, BlueprintDbResult};
use crate::indexing::extract::resolve_path_value;
use crate::indexing::rows::{DocRef, DocValue};
use crate::indexing::IndexingEngine;
use crate::infrastructure::message_bus::{MessageBus, ReindexEntryRequested};
use crate::orchestration::{
    execute_task, ReindexQueue, ReindexTask, ReindexWorker, MAX_TASK_ATTEMPTS,
};
use crate::query::{find_entry_ids, FilterOp};
use crate::schema::core::SchemaCore;
use crate::schema::types::{BlueprintKind, Path, SchemaError};

pub struct BlueprintDb {
    schema: Arc<SchemaCore>,
    indexing: Arc<IndexingEngine>,
    reindex_queue: Arc<ReindexQueue>,
    message_bus: Arc<MessageBus>,
    db_ops: Arc<DbOperations>,
    reindex_worker: Mutex<Option<ReindexWorker>>,
}

impl BlueprintDb {
    /// Opens (or creates) the engine at the given filesystem path.
    pub fn new(path: &str) -> BlueprintDbResult<Self> {
        let db = sled::open(path)?;
        Self::with_db(db)
    }

    /// Builds the engine on an already-open sled database. Tests use this
    /// with a temporary database.
    pub fn with_db(db: sled::Db) -> BlueprintDbResult<Self> {
        let db_ops = Arc::new(DbOperations::new(db)?);
        let message_bus = Arc::new(MessageBus::new());
        let reindex_queue = Arc::new(ReindexQueue::new(Arc::clone(&db_ops))?);
        let schema = Arc::new(SchemaCore::new(
            Arc::clone(&db_ops),
            Arc::clone(&message_bus),
            Arc::clone(&reindex_queue),
        )?);
        let indexing = Arc::new(IndexingEngine::new(
            Arc::clone(&db_ops),
            Arc::clone(&message_bus),
        ));

        Ok(Self {
            schema,
            indexing,
            reindex_queue,
            message_bus,
            db_ops,
            reindex_worker: Mutex::new(None),
        })
    }

    pub fn schema(&self) -> &SchemaCore {
        &self.schema
    }

    pub fn message_bus(&self) -> Arc<MessageBus> {
        Arc::clone(&self.message_bus)
    }

    pub fn reindex_queue(&self) -> Arc<ReindexQueue> {
        Arc::clone(&self.reindex_queue)
    }

    /// Starts the background reindex worker. Idempotent.
    pub fn start_reindex_worker(&self) -> BlueprintDbResult<()> {
        let mut worker = self
            .reindex_worker
            .lock()
            .map_err(|_| BlueprintDbError::Other("Failed to acquire worker lock".to_string()))?;
        if worker.is_none() {
            *worker = Some(ReindexWorker::start(
                Arc::clone(&self.schema),
                Arc::clone(&self.indexing),
                Arc::clone(&self.reindex_queue),
                Arc::clone(&self.db_ops),
                Arc::clone(&self.message_bus),
            ));
            info!("Reindex worker started");
        }
        Ok(())
    }

    /// Stops the background worker if it is running.
    pub fn stop_reindex_worker(&self) -> BlueprintDbResult<()> {
        let mut worker = self
            .reindex_worker
            .lock()
            .map_err(|_| BlueprintDbError::Other("Failed to acquire worker lock".to_string()))?;
        if let Some(running) = worker.take() {
            running.shutdown();
            info!("Reindex worker stopped");
        }
        Ok(())
    }

    /// Drains the reindex queue synchronously, for callers (and tests) that
    /// need deterministic completion instead of the background worker.
    pub fn process_pending_reindexes(&self) -> BlueprintDbResult<usize> {
        let mut processed = 0;
        while let Some(item) = self.reindex_queue.pop().map_err(BlueprintDbError::from)? {
            let key = item.task.dedup_key();
            match execute_task(&self.schema, &self.indexing, &self.db_ops, &item.task) {
                Ok(()) => processed += 1,
                Err(SchemaError::NotFound(msg)) => {
                    info!("Reindex task {} target gone ({}), dropping", key, msg);
                }
                Err(e) => {
                    let attempts = item.attempts + 1;
                    if attempts < MAX_TASK_ATTEMPTS {
                        self.reindex_queue.requeue(item.task, attempts)?;
                    }
                    return Err(BlueprintDbError::from(e));
                }
            }
        }
        Ok(processed)
    }

    // ========== Entry lifecycle ==========

    /// Creates an entry and synchronously projects its index rows.
    pub fn create_entry(&self, blueprint_id: &str, payload: Value) -> BlueprintDbResult<Entry> {
        let blueprint = self.schema.get_blueprint(blueprint_id)?;
        if blueprint.kind != BlueprintKind::Full {
            return Err(BlueprintDbError::Schema(SchemaError::InvalidData(format!(
                "Blueprint '{}' is a component and cannot have entries",
                blueprint.name
            ))));
        }

        let entry = Entry::new(blueprint_id, payload);
        self.db_ops.store_entry(&entry)?;
        let resolved = self.schema.resolved_paths(blueprint_id)?;
        self.indexing.sync_entry(&entry, &resolved)?;
        Ok(entry)
    }

    /// Replaces an entry's payload. Index rows are re-projected only when
    /// the payload changed under an indexed path.
    pub fn update_entry(&self, entry_id: &str, payload: Value) -> BlueprintDbResult<Entry> {
        let mut entry = self
            .db_ops
            .get_entry(entry_id)?
            .ok_or_else(|| SchemaError::NotFound(format!("entry {}", entry_id)))?;

        let resolved = self.schema.resolved_paths(&entry.blueprint_id)?;
        let needs_sync = indexed_payload_changed(&entry.payload, &payload, &resolved);

        entry.set_payload(payload);
        self.db_ops.store_entry(&entry)?;
        if needs_sync {
            self.indexing.sync_entry(&entry, &resolved)?;
        }
        Ok(entry)
    }

    /// Permanently removes an entry and all of its index rows.
    pub fn delete_entry(&self, entry_id: &str) -> BlueprintDbResult<()> {
        if self.db_ops.get_entry(entry_id)?.is_none() {
            return Err(BlueprintDbError::Schema(SchemaError::NotFound(format!(
                "entry {}",
                entry_id
            ))));
        }
        self.indexing.delete_entry_rows(entry_id)?;
        self.db_ops.delete_entry(entry_id)?;
        info!("Deleted entry {} and its index rows", entry_id);
        Ok(())
    }

    pub fn get_entry(&self, entry_id: &str) -> BlueprintDbResult<Option<Entry>> {
        Ok(self.db_ops.get_entry(entry_id)?)
    }

    pub fn entries_for_blueprint(&self, blueprint_id: &str) -> BlueprintDbResult<Vec<Entry>> {
        Ok(self.db_ops.entries_for_blueprint(blueprint_id)?)
    }

    /// Schedules a background re-sync of one entry.
    pub fn request_entry_reindex(&self, entry_id: &str) -> BlueprintDbResult<bool> {
        let added = self.reindex_queue.enqueue(ReindexTask::Entry {
            entry_id: entry_id.to_string(),
        })?;
        if added {
            if let Err(e) = self.message_bus.publish(ReindexEntryRequested {
                entry_id: entry_id.to_string(),
            }) {
                warn!("Failed to publish ReindexEntryRequested: {}", e);
            }
        }
        Ok(added)
    }

    // ========== Read access for the query layer ==========

    pub fn resolved_paths(&self, blueprint_id: &str) -> BlueprintDbResult<Arc<Vec<Path>>> {
        Ok(self.schema.resolved_paths(blueprint_id)?)
    }

    /// All index rows of an entry, in `(path_id, idx)` order.
    pub fn rows_for_entry(
        &self,
        entry_id: &str,
    ) -> BlueprintDbResult<(Vec<DocValue>, Vec<DocRef>)> {
        Ok(self.db_ops.rows_for_entry(entry_id)?)
    }

    /// Entry ids matching a predicate over one indexed path.
    pub fn find_entry_ids(
        &self,
        blueprint_id: &str,
        full_path: &str,
        op: FilterOp,
        value: &Value,
    ) -> BlueprintDbResult<Vec<String>> {
        let resolved = self.schema.resolved_paths(blueprint_id)?;
        Ok(find_entry_ids(
            &self.db_ops,
            &resolved,
            full_path,
            op,
            value,
        )?)
    }
}

/// Whether any live indexed path resolves differently between two payloads.
fn indexed_payload_changed(old: &Value, new: &Value, resolved_paths: &[Path]) -> bool {
    resolved_paths
        .iter()
        .filter(|p| p.is_live() && p.is_indexed && p.data_type.is_indexable())
        .any(|p| resolve_path_value(old, &p.full_path) != resolve_path_value(new, &p.full_path))
}
