//! drift-plan — the desired-state deployment plan.
//!
//! A `DeploymentPlan` is the immutable input to one convergence run: an
//! ordered set of job collections (each with declared dependencies on other
//! collections), the resource pools backing them, and global flags. This
//! crate owns:
//!
//! - **`plan`** — the plan model and TOML plan-file parsing
//! - **`pending`** — the dependency index (`PendingSet`)
//! - **`validate`** — structural plan validation, including cycle detection
//!
//! The plan is pure data; all synchronization around the pending set during
//! a run lives in `drift-converge`.

pub mod error;
pub mod pending;
pub mod plan;
pub mod validate;

pub use error::{PlanError, PlanResult};
pub use pending::PendingSet;
pub use plan::{DeploymentPlan, JobCollectionSpec, ResourcePoolSpec, UpdateConfig};
pub use validate::validate;
