//! drift-converge — the convergence coordinator.
//!
//! Drives live infrastructure from its current state to a deployment plan's
//! desired state:
//!
//! 1. Bind DNS records (skipped when the plan disables DNS)
//! 2. Update resource pools to target size
//! 3. Bind instance-to-VM associations
//! 4. Bind configuration to instances
//! 5. Delete VMs, then instances, no longer referenced by the plan
//! 6. Update job collections concurrently under their dependency order
//! 7. Refill resource pools
//!
//! Stage 6 spawns one worker per job collection; workers wait on the
//! [`DependencyGate`] until every declared dependency has completed, so the
//! only guaranteed ordering is "a collection starts only after all its named
//! dependencies have completed successfully". A checkpoint is consulted
//! between stages and once per worker before it starts its update.
//!
//! # Components
//!
//! - **`coordinator`** — the staged sequence and worker fan-out/aggregation
//! - **`gate`** — the synchronized pending set with completion signaling
//! - **`assembler`** — collaborator trait for the delegated binding steps
//! - **`event_log`** — stage/step progress reporting

pub mod assembler;
pub mod coordinator;
pub mod error;
pub mod event_log;
pub mod gate;

pub use assembler::{NoopAssembler, PlanAssembler};
pub use coordinator::{Coordinator, WorkerOutcome};
pub use error::{CollectionFailure, ConvergeError, ConvergeResult};
pub use event_log::{EventLog, Stage};
pub use gate::{DependencyGate, WaitOutcome};
