//! Simulated cloud provider.
//!
//! Backs tests and `driftd` dry runs: VMs are entries in an in-memory set,
//! every operation is recorded in order, and individual collections or pools
//! can be armed to fail.

use std::collections::HashSet;
use std::sync::Mutex;

use tracing::debug;

use crate::error::{CloudError, CloudResult};
use crate::provider::{BoxFuture, CloudProvider, VmId};

/// One recorded provider operation, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudOp {
    CreateVm { pool: String, vm: VmId },
    DeleteVm { vm: VmId },
    ConfigureInstance { collection: String, index: u32, vm: VmId },
}

#[derive(Default)]
struct SimState {
    next_id: u64,
    live_vms: HashSet<VmId>,
    ops: Vec<CloudOp>,
    fail_collections: HashSet<String>,
    fail_pools: HashSet<String>,
}

/// In-memory recording provider with failure injection.
#[derive(Default)]
pub struct SimCloud {
    state: Mutex<SimState>,
}

impl SimCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `configure_instance` to fail for the given collection.
    pub fn fail_collection(&self, collection: &str) {
        let mut state = self.state.lock().unwrap();
        state.fail_collections.insert(collection.to_string());
    }

    /// Arm `create_vm` to fail for the given pool.
    pub fn fail_pool(&self, pool: &str) {
        let mut state = self.state.lock().unwrap();
        state.fail_pools.insert(pool.to_string());
    }

    /// Every operation issued so far, in order.
    pub fn ops(&self) -> Vec<CloudOp> {
        self.state.lock().unwrap().ops.clone()
    }

    /// Number of live (created, not deleted) VMs.
    pub fn live_vm_count(&self) -> usize {
        self.state.lock().unwrap().live_vms.len()
    }

    /// Collections for which at least one instance was configured.
    pub fn configured_collections(&self) -> HashSet<String> {
        self.state
            .lock()
            .unwrap()
            .ops
            .iter()
            .filter_map(|op| match op {
                CloudOp::ConfigureInstance { collection, .. } => Some(collection.clone()),
                _ => None,
            })
            .collect()
    }
}

impl CloudProvider for SimCloud {
    fn create_vm<'a>(&'a self, pool: &'a str) -> BoxFuture<'a, CloudResult<VmId>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if state.fail_pools.contains(pool) {
                return Err(CloudError::CreateVm(format!(
                    "injected failure for pool '{pool}'"
                )));
            }
            state.next_id += 1;
            let vm: VmId = format!("vm-{}", state.next_id);
            state.live_vms.insert(vm.clone());
            state.ops.push(CloudOp::CreateVm {
                pool: pool.to_string(),
                vm: vm.clone(),
            });
            debug!(%pool, %vm, "sim: vm created");
            Ok(vm)
        })
    }

    fn delete_vm<'a>(&'a self, vm: &'a VmId) -> BoxFuture<'a, CloudResult<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if !state.live_vms.remove(vm) {
                return Err(CloudError::VmNotFound(vm.clone()));
            }
            state.ops.push(CloudOp::DeleteVm { vm: vm.clone() });
            debug!(%vm, "sim: vm deleted");
            Ok(())
        })
    }

    fn configure_instance<'a>(
        &'a self,
        collection: &'a str,
        index: u32,
        vm: &'a VmId,
    ) -> BoxFuture<'a, CloudResult<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if state.fail_collections.contains(collection) {
                return Err(CloudError::ConfigureInstance(format!(
                    "injected failure for collection '{collection}'"
                )));
            }
            if !state.live_vms.contains(vm) {
                return Err(CloudError::VmNotFound(vm.clone()));
            }
            state.ops.push(CloudOp::ConfigureInstance {
                collection: collection.to_string(),
                index,
                vm: vm.clone(),
            });
            debug!(%collection, index, %vm, "sim: instance configured");
            Ok(())
        })
    }
}
