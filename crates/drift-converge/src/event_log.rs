//! Stage/step progress reporting.
//!
//! Purely observational: stages announce an expected step count, steps are
//! tracked around named operations. Everything lands in tracing; nothing
//! here affects control flow.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

/// Emits "stage begin" and per-step events for one convergence run.
#[derive(Debug, Clone, Default)]
pub struct EventLog;

impl EventLog {
    pub fn new() -> Self {
        Self
    }

    /// Announce a stage with its expected step count.
    pub fn begin_stage(&self, name: &str, total: usize) -> Stage {
        info!(stage = %name, total, "stage begin");
        Stage {
            name: name.to_string(),
            total,
            done: AtomicUsize::new(0),
        }
    }
}

/// A stage in progress; tracks and logs named steps.
#[derive(Debug)]
pub struct Stage {
    name: String,
    total: usize,
    done: AtomicUsize,
}

impl Stage {
    /// Run an operation as one tracked step of this stage.
    pub async fn track<F>(&self, step: &str, f: F) -> F::Output
    where
        F: Future,
    {
        let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        info!(stage = %self.name, step = %step, n, total = self.total, "step started");
        let out = f.await;
        info!(stage = %self.name, step = %step, n, total = self.total, "step finished");
        out
    }

    pub fn completed(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }
}
