//! Persisted domain types: task records and their lifecycle.

use serde::{Deserialize, Serialize};

/// Unique identifier for a queued task.
pub type TaskId = u64;

/// What kind of work a task performs.
///
/// Convergence runs are enqueued by the engine itself; the scan/fix and
/// snapshot kinds are enqueued by the surrounding system through the same
/// queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Converge,
    Scan,
    ApplyResolutions,
    ScanAndFix,
    SnapshotDeployment,
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Processing,
    Done,
    Error,
    Cancelled,
}

impl TaskState {
    /// True once the task can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancelled)
    }
}

/// Persisted record of one asynchronous task.
///
/// A run with any failed worker lands in `Error` with the composite message
/// in `result`; partial success is never recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    pub id: TaskId,
    /// The requesting user.
    pub user: String,
    pub kind: TaskKind,
    /// Human-readable description, e.g. "converge deployment 'prod'".
    pub description: String,
    pub state: TaskState,
    /// Terminal message: error text for `Error`, otherwise informational.
    pub result: Option<String>,
}

impl TaskRecord {
    /// Storage key: zero-padded so lexicographic order matches id order.
    pub fn table_key(id: TaskId) -> String {
        format!("{id:020}")
    }
}
