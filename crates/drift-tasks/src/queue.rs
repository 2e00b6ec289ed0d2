//! The task queue — enqueue, run, record.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use drift_state::{StateStore, TaskId, TaskKind, TaskRecord, TaskState};

use crate::checkpoint::{CancelHandle, Checkpoint, cancellation_pair};
use crate::error::{TaskError, TaskResult};

/// Boxed future produced by a task body.
pub type TaskFuture = Pin<Box<dyn Future<Output = TaskResult<()>> + Send>>;

/// Hands long-running work to background tokio tasks and tracks each unit
/// in the state store.
pub struct TaskQueue {
    store: StateStore,
    next_id: AtomicU64,
}

impl TaskQueue {
    /// Create a queue over the given store, continuing the id sequence from
    /// any previously persisted tasks.
    pub fn new(store: StateStore) -> TaskResult<Self> {
        let next_id = AtomicU64::new(store.max_task_id()? + 1);
        Ok(Self { store, next_id })
    }

    /// Enqueue a unit of work.
    ///
    /// Persists a `Queued` record, spawns the body with a fresh checkpoint,
    /// and returns a handle carrying the task id, the cancellation side of
    /// the checkpoint, and the join handle.
    pub fn enqueue<F>(
        &self,
        user: &str,
        kind: TaskKind,
        description: &str,
        body: F,
    ) -> TaskResult<TaskHandle>
    where
        F: FnOnce(Checkpoint) -> TaskFuture,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = TaskRecord {
            id,
            user: user.to_string(),
            kind,
            description: description.to_string(),
            state: TaskState::Queued,
            result: None,
        };
        self.store.put_task(&record)?;
        info!(task = id, ?kind, %description, "task enqueued");

        let (cancel, checkpoint) = cancellation_pair();
        let fut = body(checkpoint);
        let store = self.store.clone();

        let join = tokio::spawn(async move {
            if let Err(e) = store.update_task_state(id, TaskState::Processing, None) {
                error!(task = id, error = %e, "failed to mark task processing");
            }

            let (state, result) = match fut.await {
                Ok(()) => (TaskState::Done, None),
                Err(TaskError::Cancelled) => {
                    warn!(task = id, "task cancelled");
                    (TaskState::Cancelled, Some("task cancelled".to_string()))
                }
                Err(e) => {
                    warn!(task = id, error = %e, "task failed");
                    (TaskState::Error, Some(e.to_string()))
                }
            };

            if let Err(e) = store.update_task_state(id, state, result) {
                error!(task = id, error = %e, "failed to record task state");
            }
            state
        });

        Ok(TaskHandle { id, cancel, join })
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }
}

/// Handle to one enqueued task.
pub struct TaskHandle {
    pub id: TaskId,
    cancel: CancelHandle,
    join: JoinHandle<TaskState>,
}

impl TaskHandle {
    /// Request cooperative cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A detachable handle for cancelling from another task.
    pub fn canceller(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for the task to settle and return its final record.
    pub async fn wait(self, store: &StateStore) -> TaskResult<TaskRecord> {
        if self.join.await.is_err() {
            // Body panicked; the record would otherwise be stuck Processing.
            store.update_task_state(
                self.id,
                TaskState::Error,
                Some("task panicked".to_string()),
            )?;
        }
        store
            .get_task(self.id)?
            .ok_or_else(|| TaskError::Failed(format!("task {} has no record", self.id)))
    }
}
