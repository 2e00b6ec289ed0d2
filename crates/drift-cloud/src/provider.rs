//! The `CloudProvider` trait.

use std::future::Future;
use std::pin::Pin;

use crate::error::CloudResult;

/// Cloud identifier for a VM.
pub type VmId = String;

/// Boxed future returned by provider methods, so providers are usable as
/// trait objects from spawned tasks.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// VM lifecycle operations against a cloud.
///
/// Implementations must be safe to call concurrently; the engine issues
/// operations from many workers at once.
pub trait CloudProvider: Send + Sync {
    /// Create a VM sized for the given resource pool. Returns its cloud ID.
    fn create_vm<'a>(&'a self, pool: &'a str) -> BoxFuture<'a, CloudResult<VmId>>;

    /// Destroy a VM.
    fn delete_vm<'a>(&'a self, vm: &'a VmId) -> BoxFuture<'a, CloudResult<()>>;

    /// Apply a job collection instance's configuration to a VM.
    fn configure_instance<'a>(
        &'a self,
        collection: &'a str,
        index: u32,
        vm: &'a VmId,
    ) -> BoxFuture<'a, CloudResult<()>>;
}
