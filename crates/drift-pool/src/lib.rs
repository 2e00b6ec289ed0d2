//! drift-pool — resource pool lifecycle for one convergence run.
//!
//! A resource pool is a named set of idle VMs with a target size. The
//! coordinator calls [`ResourcePools::update`] before job-collection updates
//! (reconcile membership to target) and [`ResourcePools::refill`] after all
//! workers have joined (restore membership depleted by allocation). The
//! updater calls `allocate`/`release` while converging instances.
//!
//! A VM handed out by `allocate` leaves the pool entirely — it belongs to an
//! instance until released — so reconciliation can only ever create VMs or
//! destroy idle ones, never one bound to a live instance.

pub mod error;
pub mod pools;

pub use error::{PoolError, PoolResult};
pub use pools::ResourcePools;
