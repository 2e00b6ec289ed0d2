//! drift-cloud — the cloud-provider seam.
//!
//! The convergence engine never talks to a cloud directly; it goes through
//! the [`CloudProvider`] trait. Methods return pinned boxed futures so a
//! provider can live behind `Arc<dyn CloudProvider>` and be shared across
//! spawned workers.
//!
//! [`SimCloud`] is the in-memory provider: it records every operation in
//! order and supports failure injection, which is what the test suites and
//! `driftd` dry runs use.

pub mod error;
pub mod provider;
pub mod sim;

pub use error::{CloudError, CloudResult};
pub use provider::{BoxFuture, CloudProvider, VmId};
pub use sim::{CloudOp, SimCloud};
