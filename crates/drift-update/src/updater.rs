//! The `JobUpdater` trait — the black-box update contract.

use drift_cloud::BoxFuture;
use drift_plan::{DeploymentPlan, JobCollectionSpec};

use crate::error::UpdateResult;

/// Updates one job collection's live instances to the desired topology.
///
/// Contract: safe to invoke for at most one collection name at a time,
/// concurrently with updates of any other name; on error the collection is
/// left failed but not corrupted (no half-configured instance survives);
/// errors surface to the caller and are never retried at this layer.
pub trait JobUpdater: Send + Sync {
    fn update<'a>(
        &'a self,
        plan: &'a DeploymentPlan,
        job: &'a JobCollectionSpec,
    ) -> BoxFuture<'a, UpdateResult<()>>;
}
