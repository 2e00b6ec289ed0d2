//! Task error types.

use thiserror::Error;

/// Result type alias for task operations.
pub type TaskResult<T> = Result<T, TaskError>;

/// Errors surfaced by the task layer.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A cancellation request was observed at a checkpoint.
    #[error("task cancelled")]
    Cancelled,

    /// The task body failed; the message is recorded on the task record.
    #[error("{0}")]
    Failed(String),

    #[error("state store error: {0}")]
    State(#[from] drift_state::StateError),
}
