//! Cloud-provider error types.

use thiserror::Error;

/// Result type alias for cloud operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors surfaced by a cloud provider.
///
/// The coordinator does not interpret these beyond fatal/non-fatal
/// classification; callers wrap them with pool or collection context.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("vm creation failed: {0}")]
    CreateVm(String),

    #[error("vm deletion failed: {0}")]
    DeleteVm(String),

    #[error("instance configuration failed: {0}")]
    ConfigureInstance(String),

    #[error("vm not found: {0}")]
    VmNotFound(String),
}
