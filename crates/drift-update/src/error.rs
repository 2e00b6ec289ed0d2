//! Job-collection update errors.

use thiserror::Error;

/// Result type alias for collection updates.
pub type UpdateResult<T> = Result<T, UpdateError>;

/// A single collection's update failed.
///
/// Non-fatal to sibling collections; dependents of the failed collection
/// stay blocked for the rest of the run.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("job collection '{collection}': {source}")]
    Pool {
        collection: String,
        #[source]
        source: drift_pool::PoolError,
    },

    #[error("job collection '{collection}' canary {index}: {source}")]
    Canary {
        collection: String,
        index: u32,
        #[source]
        source: drift_cloud::CloudError,
    },

    #[error("job collection '{collection}' instance {index}: {source}")]
    Instance {
        collection: String,
        index: u32,
        #[source]
        source: drift_cloud::CloudError,
    },
}
