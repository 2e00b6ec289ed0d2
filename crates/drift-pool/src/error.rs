//! Resource pool error types.

use thiserror::Error;

/// Result type alias for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors raised by the resource pool manager.
///
/// An `update` failure is fatal to the whole run; a partial pool is unsafe
/// to converge on.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("unknown resource pool: {0}")]
    UnknownPool(String),

    #[error("resource pool '{0}' has no idle vm")]
    Exhausted(String),

    #[error("resource pool '{pool}': {source}")]
    Cloud {
        pool: String,
        #[source]
        source: drift_cloud::CloudError,
    },
}
