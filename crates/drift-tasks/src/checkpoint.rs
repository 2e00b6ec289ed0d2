//! Cooperative cancellation.
//!
//! A `CancelHandle`/`Checkpoint` pair shares a watch channel. The controller
//! side requests cancellation; the task side consults `checkpoint()` between
//! stages (and before starting new units of work) and stops cleanly once the
//! request is visible. Work already in flight at a checkpoint is allowed to
//! finish before the next checkpoint honors the request.

use tokio::sync::watch;
use tracing::debug;

use crate::error::{TaskError, TaskResult};

/// Create a linked cancel-handle/checkpoint pair.
pub fn cancellation_pair() -> (CancelHandle, Checkpoint) {
    let (tx, rx) = watch::channel(false);
    (
        CancelHandle { tx },
        Checkpoint {
            rx,
            _keepalive: None,
        },
    )
}

/// Controller side: requests cancellation of a running task.
#[derive(Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Request cancellation. Observed by the task at its next checkpoint.
    pub fn cancel(&self) {
        debug!("cancellation requested");
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Task side: the cooperative cancellation point.
#[derive(Clone)]
pub struct Checkpoint {
    rx: watch::Receiver<bool>,
    // Keeps a detached checkpoint's channel open.
    _keepalive: Option<std::sync::Arc<watch::Sender<bool>>>,
}

impl Checkpoint {
    /// Checkpoint now: fails with `Cancelled` if cancellation has been
    /// requested, otherwise returns normally.
    pub fn checkpoint(&self) -> TaskResult<()> {
        if *self.rx.borrow() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once cancellation is requested; never resolves otherwise.
    ///
    /// Used in `select!` arms so a task blocked on something else can still
    /// observe cancellation.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Handle dropped without a cancel: stay pending forever.
                std::future::pending::<()>().await;
            }
        }
    }

    /// A checkpoint that can never be cancelled (for callers without a
    /// controller).
    pub fn detached() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            rx,
            _keepalive: Some(std::sync::Arc::new(tx)),
        }
    }
}
