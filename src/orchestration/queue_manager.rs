//! Queue management for background reindexing.
//!
//! Thread-safe, dedup-tolerant task queue. Tasks are idempotent; enqueueing
//! the same task twice while it is still queued is a no-op, so the cascade
//! can schedule freely without flooding the worker.

use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::db_operations::DbOperations;
use crate::schema::types::SchemaError;

const QUEUE_STATE_KEY: &str = "reindex_queue";

/// A unit of background reindex work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReindexTask {
    /// Re-sync every entry of a blueprint.
    Schema { blueprint_id: String },
    /// Re-sync one entry.
    Entry { entry_id: String },
}

impl ReindexTask {
    /// Key used for queue deduplication and failure reporting.
    pub fn dedup_key(&self) -> String {
        match self {
            ReindexTask::Schema { blueprint_id } => format!("schema|{}", blueprint_id),
            ReindexTask::Entry { entry_id } => format!("entry|{}", entry_id),
        }
    }
}

/// A queued task together with its retry count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedTask {
    pub task: ReindexTask,
    pub attempts: u32,
}

/// Internal queue state with deduplication tracking
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueState {
    pub queue: VecDeque<QueuedTask>,
    pub queued: HashSet<String>,
}

/// Thread-safe reindex queue, persisted so queued work survives restarts.
pub struct ReindexQueue {
    state: Mutex<QueueState>,
    db_ops: Arc<DbOperations>,
}

impl ReindexQueue {
    /// Creates a queue, restoring any state persisted by a previous run.
    pub fn new(db_ops: Arc<DbOperations>) -> Result<Self, SchemaError> {
        let state = db_ops
            .get_from_tree::<QueueState>(&db_ops.queue_state_tree, QUEUE_STATE_KEY)?
            .unwrap_or_default();
        if !state.queue.is_empty() {
            info!(
                "Restored reindex queue with {} pending tasks",
                state.queue.len()
            );
        }
        Ok(Self {
            state: Mutex::new(state),
            db_ops,
        })
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, QueueState>, SchemaError> {
        self.state.lock().map_err(|e| {
            error!("Failed to acquire reindex queue lock: {}", e);
            SchemaError::InvalidData("Failed to acquire reindex queue lock".to_string())
        })
    }

    fn persist(&self, state: &QueueState) -> Result<(), SchemaError> {
        self.db_ops
            .store_in_tree(&self.db_ops.queue_state_tree, QUEUE_STATE_KEY, state)
    }

    /// Adds a task if it is not already queued. Returns whether it was added.
    pub fn enqueue(&self, task: ReindexTask) -> Result<bool, SchemaError> {
        let mut state = self.lock_state()?;
        let key = task.dedup_key();
        if !state.queued.insert(key.clone()) {
            info!("Reindex task {} already queued, skipping", key);
            return Ok(false);
        }
        state.queue.push_back(QueuedTask { task, attempts: 0 });
        info!("Queued reindex task {}", key);
        self.persist(&state)?;
        Ok(true)
    }

    /// Puts a failed task back with its attempt count bumped. Bypasses
    /// deduplication: the task was already popped, so its key is free again.
    pub fn requeue(&self, task: ReindexTask, attempts: u32) -> Result<(), SchemaError> {
        let mut state = self.lock_state()?;
        let key = task.dedup_key();
        state.queued.insert(key);
        state.queue.push_back(QueuedTask { task, attempts });
        self.persist(&state)?;
        Ok(())
    }

    /// Pops the next task, releasing its dedup key.
    pub fn pop(&self) -> Result<Option<QueuedTask>, SchemaError> {
        let mut state = self.lock_state()?;
        match state.queue.pop_front() {
            Some(item) => {
                state.queued.remove(&item.task.dedup_key());
                self.persist(&state)?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    pub fn len(&self) -> Result<usize, SchemaError> {
        Ok(self.lock_state()?.queue.len())
    }

    pub fn is_empty(&self) -> Result<bool, SchemaError> {
        Ok(self.lock_state()?.queue.is_empty())
    }

    /// Dedup keys of everything currently queued, without dequeuing.
    pub fn queued_keys(&self) -> Result<Vec<String>, SchemaError> {
        Ok(self
            .lock_state()?
            .queue
            .iter()
            .map(|item| item.task.dedup_key())
            .collect())
    }
}
