//! The resource pool manager.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use drift_cloud::{CloudProvider, VmId};
use drift_plan::ResourcePoolSpec;

use crate::error::{PoolError, PoolResult};

/// Per-pool runtime state. Only idle VMs are reachable for reconciliation;
/// an allocated VM belongs to its instance until released back, counted in
/// `bound` so membership stays observable.
struct PoolState {
    spec: ResourcePoolSpec,
    idle: VecDeque<VmId>,
    bound: usize,
}

/// Manages all resource pools for one convergence run.
///
/// `update` and `refill` are only ever invoked by the coordinator, in
/// sequence, never concurrently with each other; `allocate`/`release` are
/// called from job-collection workers between the two.
pub struct ResourcePools {
    cloud: Arc<dyn CloudProvider>,
    pools: Mutex<HashMap<String, PoolState>>,
}

impl ResourcePools {
    pub fn new(cloud: Arc<dyn CloudProvider>, specs: &[ResourcePoolSpec]) -> Self {
        let pools = specs
            .iter()
            .map(|spec| {
                (
                    spec.name.clone(),
                    PoolState {
                        spec: spec.clone(),
                        idle: VecDeque::new(),
                        bound: 0,
                    },
                )
            })
            .collect();
        Self {
            cloud,
            pools: Mutex::new(pools),
        }
    }

    /// Reconcile every pool's membership with its target size.
    ///
    /// Grows pools by creating VMs, shrinks by destroying surplus idle VMs.
    /// Idempotent: a second call with unchanged state performs no work.
    pub async fn update(&self) -> PoolResult<()> {
        let mut pools = self.pools.lock().await;
        for state in pools.values_mut() {
            let pool_name = state.spec.name.clone();
            let target = state.spec.size as usize;

            while state.idle.len() < target {
                let vm = self
                    .cloud
                    .create_vm(&pool_name)
                    .await
                    .map_err(|source| PoolError::Cloud {
                        pool: pool_name.clone(),
                        source,
                    })?;
                state.idle.push_back(vm);
            }

            while state.idle.len() > target {
                // Surplus comes off the back; allocation order is preserved.
                let Some(vm) = state.idle.pop_back() else {
                    break;
                };
                if let Err(source) = self.cloud.delete_vm(&vm).await {
                    state.idle.push_back(vm);
                    return Err(PoolError::Cloud {
                        pool: pool_name.clone(),
                        source,
                    });
                }
            }

            info!(pool = %pool_name, size = state.idle.len(), "resource pool updated");
        }
        Ok(())
    }

    /// Restore every pool's membership to target after allocation depleted
    /// it. Grow-only; must not run while workers are still allocating.
    pub async fn refill(&self) -> PoolResult<()> {
        let mut pools = self.pools.lock().await;
        for state in pools.values_mut() {
            let pool_name = state.spec.name.clone();
            let target = state.spec.size as usize;
            let missing = target.saturating_sub(state.idle.len());

            for _ in 0..missing {
                let vm = self
                    .cloud
                    .create_vm(&pool_name)
                    .await
                    .map_err(|source| PoolError::Cloud {
                        pool: pool_name.clone(),
                        source,
                    })?;
                state.idle.push_back(vm);
            }

            if missing > 0 {
                info!(pool = %pool_name, refilled = missing, "resource pool refilled");
            }
        }
        Ok(())
    }

    /// Take an idle VM out of a pool for an instance.
    ///
    /// Fails with `Exhausted` when the pool has no idle VM; growing past
    /// target is exclusively `update`/`refill` business, so allocation can
    /// never race reconciliation into over-capacity.
    pub async fn allocate(&self, pool: &str) -> PoolResult<VmId> {
        let mut pools = self.pools.lock().await;
        let state = pools
            .get_mut(pool)
            .ok_or_else(|| PoolError::UnknownPool(pool.to_string()))?;
        let vm = state
            .idle
            .pop_front()
            .ok_or_else(|| PoolError::Exhausted(pool.to_string()))?;
        state.bound += 1;
        debug!(%pool, %vm, "vm allocated from pool");
        Ok(vm)
    }

    /// Return a VM to a pool's idle set.
    pub async fn release(&self, pool: &str, vm: VmId) -> PoolResult<()> {
        let mut pools = self.pools.lock().await;
        let state = pools
            .get_mut(pool)
            .ok_or_else(|| PoolError::UnknownPool(pool.to_string()))?;
        debug!(%pool, %vm, "vm released to pool");
        state.idle.push_back(vm);
        state.bound = state.bound.saturating_sub(1);
        Ok(())
    }

    /// Idle member count for a pool.
    pub async fn idle_count(&self, pool: &str) -> PoolResult<usize> {
        let pools = self.pools.lock().await;
        pools
            .get(pool)
            .map(|s| s.idle.len())
            .ok_or_else(|| PoolError::UnknownPool(pool.to_string()))
    }

    /// Number of VMs handed out to instances and not yet released.
    pub async fn bound_count(&self, pool: &str) -> PoolResult<usize> {
        let pools = self.pools.lock().await;
        pools
            .get(pool)
            .map(|s| s.bound)
            .ok_or_else(|| PoolError::UnknownPool(pool.to_string()))
    }

    /// Total membership: idle plus bound.
    pub async fn member_count(&self, pool: &str) -> PoolResult<usize> {
        let pools = self.pools.lock().await;
        pools
            .get(pool)
            .map(|s| s.idle.len() + s.bound)
            .ok_or_else(|| PoolError::UnknownPool(pool.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_cloud::{CloudOp, SimCloud};

    fn specs(entries: &[(&str, u32)]) -> Vec<ResourcePoolSpec> {
        entries
            .iter()
            .map(|(name, size)| ResourcePoolSpec {
                name: name.to_string(),
                size: *size,
            })
            .collect()
    }

    #[tokio::test]
    async fn update_grows_to_target() {
        let cloud = Arc::new(SimCloud::new());
        let pools = ResourcePools::new(cloud.clone(), &specs(&[("small", 3)]));

        pools.update().await.unwrap();
        assert_eq!(pools.idle_count("small").await.unwrap(), 3);
        assert_eq!(cloud.live_vm_count(), 3);
    }

    #[tokio::test]
    async fn update_is_idempotent() {
        let cloud = Arc::new(SimCloud::new());
        let pools = ResourcePools::new(cloud.clone(), &specs(&[("small", 2)]));

        pools.update().await.unwrap();
        let ops_after_first = cloud.ops().len();
        pools.update().await.unwrap();
        assert_eq!(cloud.ops().len(), ops_after_first);
    }

    #[tokio::test]
    async fn update_failure_names_the_pool() {
        let cloud = Arc::new(SimCloud::new());
        cloud.fail_pool("small");
        let pools = ResourcePools::new(cloud.clone(), &specs(&[("small", 2)]));

        match pools.update().await {
            Err(PoolError::Cloud { pool, .. }) => assert_eq!(pool, "small"),
            other => panic!("expected Cloud error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn allocate_depletes_and_refill_restores() {
        let cloud = Arc::new(SimCloud::new());
        let pools = ResourcePools::new(cloud.clone(), &specs(&[("small", 2)]));
        pools.update().await.unwrap();

        let _vm1 = pools.allocate("small").await.unwrap();
        let _vm2 = pools.allocate("small").await.unwrap();
        assert_eq!(pools.idle_count("small").await.unwrap(), 0);
        assert!(matches!(
            pools.allocate("small").await,
            Err(PoolError::Exhausted(_))
        ));

        pools.refill().await.unwrap();
        assert_eq!(pools.idle_count("small").await.unwrap(), 2);
        // Two original VMs still live with their instances, two new members.
        assert_eq!(cloud.live_vm_count(), 4);
    }

    #[tokio::test]
    async fn release_returns_vm_to_idle() {
        let cloud = Arc::new(SimCloud::new());
        let pools = ResourcePools::new(cloud, &specs(&[("small", 1)]));
        pools.update().await.unwrap();

        let vm = pools.allocate("small").await.unwrap();
        pools.release("small", vm.clone()).await.unwrap();
        assert_eq!(pools.idle_count("small").await.unwrap(), 1);
        assert_eq!(pools.allocate("small").await.unwrap(), vm);
    }

    #[tokio::test]
    async fn reconciliation_never_touches_allocated_vms() {
        let cloud = Arc::new(SimCloud::new());
        let pools = ResourcePools::new(cloud.clone(), &specs(&[("small", 2)]));
        pools.update().await.unwrap();

        let bound = pools.allocate("small").await.unwrap();
        pools.update().await.unwrap();
        pools.refill().await.unwrap();

        // Reconciliation only ever created VMs; the allocated one is out of
        // the pool's reach entirely.
        assert!(!cloud.ops().iter().any(|op| matches!(
            op,
            CloudOp::DeleteVm { vm } if *vm == bound
        )));
        assert_eq!(pools.idle_count("small").await.unwrap(), 2);
        assert_eq!(pools.bound_count("small").await.unwrap(), 1);
        assert_eq!(pools.member_count("small").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn bound_and_member_counts_track_allocation() {
        let cloud = Arc::new(SimCloud::new());
        let pools = ResourcePools::new(cloud, &specs(&[("small", 3)]));
        pools.update().await.unwrap();
        assert_eq!(pools.bound_count("small").await.unwrap(), 0);
        assert_eq!(pools.member_count("small").await.unwrap(), 3);

        let vm1 = pools.allocate("small").await.unwrap();
        let _vm2 = pools.allocate("small").await.unwrap();
        assert_eq!(pools.idle_count("small").await.unwrap(), 1);
        assert_eq!(pools.bound_count("small").await.unwrap(), 2);
        assert_eq!(pools.member_count("small").await.unwrap(), 3);

        pools.release("small", vm1).await.unwrap();
        assert_eq!(pools.idle_count("small").await.unwrap(), 2);
        assert_eq!(pools.bound_count("small").await.unwrap(), 1);
        assert_eq!(pools.member_count("small").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn update_shrinks_surplus_idle() {
        let cloud = Arc::new(SimCloud::new());
        let pools = ResourcePools::new(cloud.clone(), &specs(&[("small", 3)]));
        pools.update().await.unwrap();

        // Returned VM pushes idle above a shrunken target.
        let extra = cloud.create_vm("small").await.unwrap();
        pools.release("small", extra).await.unwrap();
        assert_eq!(pools.idle_count("small").await.unwrap(), 4);

        pools.update().await.unwrap();
        assert_eq!(pools.idle_count("small").await.unwrap(), 3);
        assert_eq!(cloud.live_vm_count(), 3);
    }

    #[tokio::test]
    async fn unknown_pool_is_rejected() {
        let cloud = Arc::new(SimCloud::new());
        let pools = ResourcePools::new(cloud, &specs(&[("small", 1)]));
        assert!(matches!(
            pools.allocate("huge").await,
            Err(PoolError::UnknownPool(_))
        ));
    }

    #[tokio::test]
    async fn refill_is_noop_when_full() {
        let cloud = Arc::new(SimCloud::new());
        let pools = ResourcePools::new(cloud.clone(), &specs(&[("small", 2)]));
        pools.update().await.unwrap();
        let ops = cloud.ops().len();
        pools.refill().await.unwrap();
        assert_eq!(cloud.ops().len(), ops);
    }
}
