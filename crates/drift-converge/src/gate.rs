//! Synchronized pending set with completion signaling.
//!
//! Wraps a [`PendingSet`] for the job-collection stage. Workers never touch
//! the set directly; they wait on the gate, and completions are published
//! through a watch channel so dependents wake as soon as their last
//! dependency lands.
//!
//! A name that will never complete (its update failed, or its worker was
//! cancelled before starting) is marked abandoned so dependents settle as
//! blocked instead of waiting forever.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

use drift_plan::PendingSet;

/// Result of waiting for a set of dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Every dependency completed successfully.
    Ready,
    /// The named dependency will never complete; the waiter must not start.
    Blocked(String),
}

struct GateState {
    pending: PendingSet,
    abandoned: HashSet<String>,
}

struct GateInner {
    state: Mutex<GateState>,
    // Version counter; bumped on every completion or abandonment.
    version: watch::Sender<u64>,
}

/// Shared dependency gate for one convergence run.
#[derive(Clone)]
pub struct DependencyGate {
    inner: Arc<GateInner>,
}

impl DependencyGate {
    pub fn new(pending: PendingSet) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(GateInner {
                state: Mutex::new(GateState {
                    pending,
                    abandoned: HashSet::new(),
                }),
                version,
            }),
        }
    }

    /// Wait until none of `deps` is pending, or until one of them is marked
    /// abandoned. A collection with no dependencies returns immediately.
    ///
    /// The check and the removal in `complete` are mutually exclusive; a
    /// waiter can never observe a torn removal.
    pub async fn wait_for(&self, deps: &[String]) -> WaitOutcome {
        let mut rx = self.inner.version.subscribe();
        loop {
            {
                let state = self.inner.state.lock().unwrap();
                if let Some(dead) = deps.iter().find(|d| state.abandoned.contains(d.as_str())) {
                    return WaitOutcome::Blocked(dead.clone());
                }
                if !state.pending.contains_any(deps) {
                    return WaitOutcome::Ready;
                }
            }
            // The sender lives in this gate, so the channel cannot close
            // while a waiter holds a reference to it.
            let _ = rx.changed().await;
        }
    }

    /// Mark a collection completed, waking all waiters. Returns true if the
    /// name was pending (i.e. something depended on it).
    pub fn complete(&self, name: &str) -> bool {
        let removed = {
            let mut state = self.inner.state.lock().unwrap();
            state.pending.complete(name)
        };
        if removed {
            debug!(job = %name, "dependency completed");
            self.inner.version.send_modify(|v| *v += 1);
        }
        removed
    }

    /// Mark a collection as never-completing (failed or cancelled before
    /// starting). Its name stays pending; dependents settle as blocked.
    pub fn abandon(&self, name: &str) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.abandoned.insert(name.to_string());
        }
        debug!(job = %name, "dependency abandoned");
        self.inner.version.send_modify(|v| *v += 1);
    }

    /// Names still gating dependents.
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().unwrap().pending.len()
    }
}
