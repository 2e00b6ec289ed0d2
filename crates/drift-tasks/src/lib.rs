//! drift-tasks — long-running work as queued, cancellable tasks.
//!
//! A task is identified by (requesting user, kind, description); its record
//! is persisted through `drift-state` and transitions
//! `Queued → Processing → Done | Error | Cancelled`. The body of a task
//! receives a [`Checkpoint`]: a cooperative cancellation point it consults
//! between stages of its work.

pub mod checkpoint;
pub mod error;
pub mod queue;

pub use checkpoint::{CancelHandle, Checkpoint, cancellation_pair};
pub use error::{TaskError, TaskResult};
pub use queue::{TaskFuture, TaskHandle, TaskQueue};
