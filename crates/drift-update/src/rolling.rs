//! Canary-then-batch collection updates.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use drift_cloud::{BoxFuture, CloudError, CloudProvider, VmId};
use drift_plan::{DeploymentPlan, JobCollectionSpec};
use drift_pool::ResourcePools;

use crate::error::{UpdateError, UpdateResult};
use crate::updater::JobUpdater;

/// Converges one collection's instances: canaries one at a time, then the
/// remainder in batches of `max_in_flight`.
///
/// Keeps a registry of which VM backs which instance index. A new instance
/// takes a VM from the collection's resource pool; a surviving instance is
/// reconfigured on the VM it already holds; an instance past the desired
/// count releases its VM back to the pool.
pub struct RollingUpdater {
    cloud: Arc<dyn CloudProvider>,
    pools: Arc<ResourcePools>,
    // collection name -> instance index -> backing VM
    bound: Mutex<HashMap<String, BTreeMap<u32, VmId>>>,
}

impl RollingUpdater {
    pub fn new(cloud: Arc<dyn CloudProvider>, pools: Arc<ResourcePools>) -> Self {
        Self {
            cloud,
            pools,
            bound: Mutex::new(HashMap::new()),
        }
    }

    fn binding(&self, collection: &str, index: u32) -> Option<VmId> {
        self.bound
            .lock()
            .unwrap()
            .get(collection)
            .and_then(|m| m.get(&index).cloned())
    }

    fn record_binding(&self, collection: &str, index: u32, vm: VmId) {
        self.bound
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .insert(index, vm);
    }

    /// Drop bindings at or past the desired count, returning their VMs.
    fn take_surplus(&self, collection: &str, instances: u32) -> Vec<(u32, VmId)> {
        let mut bound = self.bound.lock().unwrap();
        match bound.get_mut(collection) {
            Some(m) => m.split_off(&instances).into_iter().collect(),
            None => Vec::new(),
        }
    }

    async fn release_vm(&self, job: &JobCollectionSpec, vm: VmId) {
        if let Err(e) = self.pools.release(&job.resource_pool, vm).await {
            warn!(job = %job.name, error = %e, "failed to release vm back to pool");
        }
    }

    /// Converge one instance. A fresh VM that fails configuration goes back
    /// to the pool unrecorded, so no half-configured instance survives; the
    /// inner error is wrapped with canary/instance context by the caller.
    async fn converge_instance(
        &self,
        job: &JobCollectionSpec,
        index: u32,
    ) -> UpdateResult<Result<(), CloudError>> {
        let (vm, fresh) = match self.binding(&job.name, index) {
            Some(vm) => (vm, false),
            None => {
                let vm = self
                    .pools
                    .allocate(&job.resource_pool)
                    .await
                    .map_err(|source| UpdateError::Pool {
                        collection: job.name.clone(),
                        source,
                    })?;
                (vm, true)
            }
        };

        match self.cloud.configure_instance(&job.name, index, &vm).await {
            Ok(()) => {
                self.record_binding(&job.name, index, vm);
                Ok(Ok(()))
            }
            Err(source) => {
                if fresh {
                    self.release_vm(job, vm).await;
                }
                Ok(Err(source))
            }
        }
    }

    async fn update_inner(
        &self,
        _plan: &DeploymentPlan,
        job: &JobCollectionSpec,
    ) -> UpdateResult<()> {
        let canaries = job.update.canaries.min(job.instances);
        let batch = job.update.max_in_flight.max(1);

        info!(
            job = %job.name,
            instances = job.instances,
            canaries,
            max_in_flight = batch,
            "updating job collection"
        );

        // Removed instances first: their VMs go back to the idle pool
        // before any new instance asks for one.
        for (index, vm) in self.take_surplus(&job.name, job.instances) {
            debug!(job = %job.name, index, %vm, "instance removed, releasing vm");
            self.release_vm(job, vm).await;
        }

        for index in 0..canaries {
            if let Err(source) = self.converge_instance(job, index).await? {
                warn!(job = %job.name, index, "canary failed, stopping update");
                return Err(UpdateError::Canary {
                    collection: job.name.clone(),
                    index,
                    source,
                });
            }
            debug!(job = %job.name, index, "canary passed");
        }

        let mut index = canaries;
        while index < job.instances {
            let upper = (index + batch).min(job.instances);
            for i in index..upper {
                if let Err(source) = self.converge_instance(job, i).await? {
                    warn!(job = %job.name, index = i, "instance update failed, stopping");
                    return Err(UpdateError::Instance {
                        collection: job.name.clone(),
                        index: i,
                        source,
                    });
                }
            }
            debug!(job = %job.name, from = index, to = upper, "batch applied");
            index = upper;
        }

        info!(job = %job.name, "job collection updated");
        Ok(())
    }
}

impl JobUpdater for RollingUpdater {
    fn update<'a>(
        &'a self,
        plan: &'a DeploymentPlan,
        job: &'a JobCollectionSpec,
    ) -> BoxFuture<'a, UpdateResult<()>> {
        Box::pin(self.update_inner(plan, job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_cloud::{CloudOp, SimCloud};
    use drift_plan::{ResourcePoolSpec, UpdateConfig};

    fn plan_with(job: JobCollectionSpec, pool_size: u32) -> DeploymentPlan {
        DeploymentPlan {
            name: "test".to_string(),
            dns_enabled: false,
            resource_pools: vec![ResourcePoolSpec {
                name: "small".to_string(),
                size: pool_size,
            }],
            job_collections: vec![job],
        }
    }

    fn job(name: &str, instances: u32, canaries: u32, max_in_flight: u32) -> JobCollectionSpec {
        JobCollectionSpec {
            name: name.to_string(),
            depends_on: vec![],
            instances,
            resource_pool: "small".to_string(),
            update: UpdateConfig {
                canaries,
                max_in_flight,
            },
        }
    }

    async fn setup(pool_size: u32) -> (Arc<SimCloud>, Arc<ResourcePools>, RollingUpdater) {
        let cloud = Arc::new(SimCloud::new());
        let pools = Arc::new(ResourcePools::new(
            cloud.clone(),
            &[ResourcePoolSpec {
                name: "small".to_string(),
                size: pool_size,
            }],
        ));
        pools.update().await.unwrap();
        let updater = RollingUpdater::new(cloud.clone(), pools.clone());
        (cloud, pools, updater)
    }

    #[tokio::test]
    async fn configures_every_instance() {
        let (cloud, _pools, updater) = setup(4).await;
        let job = job("web", 3, 1, 2);
        let plan = plan_with(job.clone(), 4);

        updater.update(&plan, &job).await.unwrap();

        let configured: Vec<u32> = cloud
            .ops()
            .into_iter()
            .filter_map(|op| match op {
                CloudOp::ConfigureInstance { index, .. } => Some(index),
                _ => None,
            })
            .collect();
        assert_eq!(configured, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn canary_failure_stops_before_the_rest() {
        let (cloud, pools, updater) = setup(4).await;
        cloud.fail_collection("web");
        let job = job("web", 3, 1, 2);
        let plan = plan_with(job.clone(), 4);

        let err = updater.update(&plan, &job).await.unwrap_err();
        assert!(matches!(err, UpdateError::Canary { index: 0, .. }));

        // Exactly one configure attempt was made, and the canary's VM went
        // back to the pool.
        assert!(cloud.configured_collections().is_empty());
        assert_eq!(pools.idle_count("small").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn pool_exhaustion_is_wrapped_with_collection_name() {
        let (_cloud, _pools, updater) = setup(1).await;
        let job = job("web", 3, 1, 1);
        let plan = plan_with(job.clone(), 1);

        let err = updater.update(&plan, &job).await.unwrap_err();
        match err {
            UpdateError::Pool { collection, source } => {
                assert_eq!(collection, "web");
                assert!(matches!(source, drift_pool::PoolError::Exhausted(_)));
            }
            other => panic!("expected Pool error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_canaries_goes_straight_to_batches() {
        let (cloud, _pools, updater) = setup(4).await;
        let job = job("db", 2, 0, 2);
        let plan = plan_with(job.clone(), 4);

        updater.update(&plan, &job).await.unwrap();
        assert!(cloud.configured_collections().contains("db"));
    }

    #[tokio::test]
    async fn scale_down_releases_surplus_vms() {
        let (cloud, pools, updater) = setup(4).await;
        let big = job("web", 3, 1, 2);
        let plan = plan_with(big.clone(), 4);
        updater.update(&plan, &big).await.unwrap();
        assert_eq!(pools.bound_count("small").await.unwrap(), 3);
        assert_eq!(pools.idle_count("small").await.unwrap(), 1);

        // Redeploy with fewer instances: the surplus VMs come back idle.
        let small = job("web", 1, 1, 2);
        updater.update(&plan, &small).await.unwrap();
        assert_eq!(pools.bound_count("small").await.unwrap(), 1);
        assert_eq!(pools.idle_count("small").await.unwrap(), 3);
        // Shrinking reassigns capacity; no VM is created or destroyed.
        assert_eq!(cloud.live_vm_count(), 4);
    }

    #[tokio::test]
    async fn reconverge_reuses_bound_vms() {
        let (cloud, pools, updater) = setup(4).await;
        let j = job("web", 2, 1, 2);
        let plan = plan_with(j.clone(), 4);
        updater.update(&plan, &j).await.unwrap();
        let creates = cloud
            .ops()
            .iter()
            .filter(|op| matches!(op, CloudOp::CreateVm { .. }))
            .count();

        updater.update(&plan, &j).await.unwrap();
        let creates_after = cloud
            .ops()
            .iter()
            .filter(|op| matches!(op, CloudOp::CreateVm { .. }))
            .count();

        // Surviving instances are reconfigured on the VMs they already hold.
        assert_eq!(creates_after, creates);
        assert_eq!(pools.bound_count("small").await.unwrap(), 2);
        assert_eq!(pools.idle_count("small").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn canaries_capped_at_instance_count() {
        let (cloud, _pools, updater) = setup(4).await;
        let job = job("db", 1, 3, 1);
        let plan = plan_with(job.clone(), 4);

        updater.update(&plan, &job).await.unwrap();

        let configured: Vec<u32> = cloud
            .ops()
            .into_iter()
            .filter_map(|op| match op {
                CloudOp::ConfigureInstance { index, .. } => Some(index),
                _ => None,
            })
            .collect();
        assert_eq!(configured, vec![0]);
    }
}
