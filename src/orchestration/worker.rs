//! Background reindex worker.
//!
//! A single polling thread drains the reindex queue. Tasks are idempotent,
//! so transient storage failures are retried by re-enqueueing with a bumped
//! attempt count; a task that exhausts its attempts is reported and dropped
//! without blocking the rest of the queue.

use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::queue_manager::{QueuedTask, ReindexQueue, ReindexTask};
use crate::db_operations::DbOperations;
use crate::indexing::IndexingEngine;
use crate::infrastructure::message_bus::{MessageBus, ReindexTaskFailed};
use crate::schema::core::SchemaCore;
use crate::schema::types::SchemaError;

pub(crate) const MAX_TASK_ATTEMPTS: u32 = 3;

/// Executes one reindex task. Shared between the background worker and the
/// synchronous drain on the facade.
pub(crate) fn execute_task(
    schema: &SchemaCore,
    engine: &IndexingEngine,
    db_ops: &DbOperations,
    task: &ReindexTask,
) -> Result<(), SchemaError> {
    match task {
        ReindexTask::Schema { blueprint_id } => {
            let resolved = schema.resolved_paths(blueprint_id)?;
            let entries = db_ops.entries_for_blueprint(blueprint_id)?;
            let count = engine.reindex_entries(&resolved, &entries)?;
            info!("Reindexed {} entries of blueprint {}", count, blueprint_id);
            Ok(())
        }
        ReindexTask::Entry { entry_id } => {
            let entry = db_ops
                .get_entry(entry_id)?
                .ok_or_else(|| SchemaError::NotFound(format!("entry {}", entry_id)))?;
            let resolved = schema.resolved_paths(&entry.blueprint_id)?;
            engine.sync_entry(&entry, &resolved)?;
            Ok(())
        }
    }
}

/// Owns the polling thread. Dropping the worker signals shutdown.
pub struct ReindexWorker {
    shutdown: Arc<AtomicBool>,
    _worker_thread: Option<thread::JoinHandle<()>>,
}

impl ReindexWorker {
    /// Spawns the worker thread and starts draining the queue.
    pub fn start(
        schema: Arc<SchemaCore>,
        engine: Arc<IndexingEngine>,
        queue: Arc<ReindexQueue>,
        db_ops: Arc<DbOperations>,
        message_bus: Arc<MessageBus>,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);

        let worker_thread = thread::spawn(move || {
            info!("🚀 ReindexWorker: starting queue monitoring");
            loop {
                if shutdown_flag.load(Ordering::Relaxed) {
                    info!("ReindexWorker: shutdown requested, stopping");
                    break;
                }
                match queue.pop() {
                    Ok(Some(item)) => {
                        Self::run_task(&schema, &engine, &queue, &message_bus, &db_ops, item);
                    }
                    Ok(None) => {
                        // Small sleep to prevent busy waiting
                        thread::sleep(Duration::from_millis(10));
                    }
                    Err(e) => {
                        error!("❌ ReindexWorker: failed to pop task: {}", e);
                        thread::sleep(Duration::from_millis(100));
                    }
                }
            }
        });

        Self {
            shutdown,
            _worker_thread: Some(worker_thread),
        }
    }

    fn run_task(
        schema: &SchemaCore,
        engine: &IndexingEngine,
        queue: &ReindexQueue,
        message_bus: &MessageBus,
        db_ops: &DbOperations,
        item: QueuedTask,
    ) {
        let key = item.task.dedup_key();
        match execute_task(schema, engine, db_ops, &item.task) {
            Ok(()) => {
                info!("✅ ReindexWorker: task {} completed", key);
            }
            Err(SchemaError::NotFound(msg)) => {
                // The target disappeared between scheduling and execution;
                // nothing left to reindex.
                info!("ReindexWorker: task {} target gone ({}), dropping", key, msg);
            }
            Err(e) => {
                let attempts = item.attempts + 1;
                if attempts < MAX_TASK_ATTEMPTS {
                    warn!(
                        "ReindexWorker: task {} failed (attempt {}/{}): {}; requeueing",
                        key, attempts, MAX_TASK_ATTEMPTS, e
                    );
                    if let Err(requeue_err) = queue.requeue(item.task, attempts) {
                        error!(
                            "❌ ReindexWorker: failed to requeue task {}: {}",
                            key, requeue_err
                        );
                    }
                } else {
                    error!(
                        "❌ ReindexWorker: task {} failed permanently after {} attempts: {}",
                        key, attempts, e
                    );
                    if let Err(publish_err) = message_bus.publish(ReindexTaskFailed {
                        task_key: key.clone(),
                        error: e.to_string(),
                    }) {
                        warn!("Failed to publish ReindexTaskFailed: {}", publish_err);
                    }
                }
            }
        }
    }

    /// Signals the worker thread to stop after its current task.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for ReindexWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
