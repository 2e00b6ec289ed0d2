//! drift-update — updating a single job collection.
//!
//! The coordinator treats a collection update as a black-box unit of work
//! behind the [`JobUpdater`] trait: safe to run for one collection name
//! concurrently with updates of any other name, leaves the collection in a
//! well-defined failed state on error, never retries.
//!
//! [`RollingUpdater`] is the concrete implementation: canary instances first,
//! one at a time, then batches of `max_in_flight`, each instance backed by a
//! VM allocated from the collection's resource pool.

pub mod error;
pub mod rolling;
pub mod updater;

pub use error::{UpdateError, UpdateResult};
pub use rolling::RollingUpdater;
pub use updater::JobUpdater;
