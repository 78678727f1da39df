//! Background reindex orchestration: the dedup-tolerant task queue and the
//! worker thread that drains it.

mod queue_manager;
mod worker;

pub use queue_manager::{QueueState, QueuedTask, ReindexQueue, ReindexTask};
pub use worker::ReindexWorker;

pub(crate) use worker::{execute_task, MAX_TASK_ATTEMPTS};
