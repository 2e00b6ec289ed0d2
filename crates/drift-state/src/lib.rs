//! drift-state — embedded state store for the convergence engine.
//!
//! Backed by [redb](https://docs.rs/redb): deployment plans and task records
//! are JSON-serialized into `&[u8]` value columns keyed by plan name and
//! zero-padded task id.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and is shared between the task queue and the daemon.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
