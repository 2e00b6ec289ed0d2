//! The plan assembler — collaborator seam for the delegated binding steps.
//!
//! DNS binding, instance/VM association, configuration binding, and
//! stale-resource deletion are thin I/O wrappers owned by the surrounding
//! system. The coordinator only sequences them.

use tracing::debug;

use drift_cloud::BoxFuture;

/// Delegated binding and cleanup operations around a convergence run.
pub trait PlanAssembler: Send + Sync {
    /// Bind DNS records for the deployment.
    fn bind_dns(&self) -> BoxFuture<'_, anyhow::Result<()>>;

    /// Associate instances with their VMs.
    fn bind_instance_vms(&self) -> BoxFuture<'_, anyhow::Result<()>>;

    /// Bind configuration to instances.
    fn bind_configuration(&self) -> BoxFuture<'_, anyhow::Result<()>>;

    /// Delete VMs no longer referenced by the plan. Runs before instance
    /// deletion: an instance reference may pin a VM.
    fn delete_unneeded_vms(&self) -> BoxFuture<'_, anyhow::Result<()>>;

    /// Delete instances no longer referenced by the plan.
    fn delete_unneeded_instances(&self) -> BoxFuture<'_, anyhow::Result<()>>;
}

/// Assembler that logs each step and succeeds; used for dry runs.
#[derive(Debug, Default)]
pub struct NoopAssembler;

impl PlanAssembler for NoopAssembler {
    fn bind_dns(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async {
            debug!("bind_dns (noop)");
            Ok(())
        })
    }

    fn bind_instance_vms(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async {
            debug!("bind_instance_vms (noop)");
            Ok(())
        })
    }

    fn bind_configuration(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async {
            debug!("bind_configuration (noop)");
            Ok(())
        })
    }

    fn delete_unneeded_vms(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async {
            debug!("delete_unneeded_vms (noop)");
            Ok(())
        })
    }

    fn delete_unneeded_instances(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async {
            debug!("delete_unneeded_instances (noop)");
            Ok(())
        })
    }
}
