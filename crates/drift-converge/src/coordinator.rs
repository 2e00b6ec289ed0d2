//! The convergence coordinator.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use drift_plan::{DeploymentPlan, PendingSet};
use drift_pool::ResourcePools;
use drift_tasks::Checkpoint;
use drift_update::{JobUpdater, UpdateError};

use crate::assembler::PlanAssembler;
use crate::error::{CollectionFailure, ConvergeError, ConvergeResult};
use crate::event_log::EventLog;
use crate::gate::{DependencyGate, WaitOutcome};

/// Tagged result of one job-collection worker.
///
/// Aggregation is driven by this data, not by unwind behavior: `Failed`
/// collections form the composite error, `Blocked` ones never started
/// because an ancestor failed, `Cancelled` ones honored a checkpoint.
#[derive(Debug)]
pub enum WorkerOutcome {
    Completed,
    Failed(UpdateError),
    Blocked { dependency: String },
    Cancelled,
}

/// Orchestrates one convergence run against one deployment plan.
pub struct Coordinator {
    plan: Arc<DeploymentPlan>,
    pools: Arc<ResourcePools>,
    updater: Arc<dyn JobUpdater>,
    assembler: Arc<dyn PlanAssembler>,
    event_log: EventLog,
}

impl Coordinator {
    pub fn new(
        plan: Arc<DeploymentPlan>,
        pools: Arc<ResourcePools>,
        updater: Arc<dyn JobUpdater>,
        assembler: Arc<dyn PlanAssembler>,
    ) -> Self {
        Self {
            plan,
            pools,
            updater,
            assembler,
            event_log: EventLog::new(),
        }
    }

    /// Run the staged convergence sequence.
    ///
    /// The checkpoint is consulted between stages and once per worker right
    /// before its update; a cancellation request stops the run cleanly at
    /// the next checkpoint.
    pub async fn run(&self, checkpoint: &Checkpoint) -> ConvergeResult<()> {
        drift_plan::validate(&self.plan)?;
        self.checkpoint(checkpoint)?;

        let stage = self.event_log.begin_stage("Preparing DNS", 1);
        stage
            .track("Binding DNS", async {
                if self.plan.dns_enabled {
                    self.assembler.bind_dns().await
                } else {
                    Ok(())
                }
            })
            .await
            .map_err(|source| ConvergeError::Assembler {
                op: "binding dns",
                source,
            })?;

        info!(plan = %self.plan.name, "updating resource pools");
        self.pools.update().await?;
        self.checkpoint(checkpoint)?;

        info!(plan = %self.plan.name, "binding instance vms");
        self.assembler
            .bind_instance_vms()
            .await
            .map_err(|source| ConvergeError::Assembler {
                op: "binding instance vms",
                source,
            })?;

        let stage = self.event_log.begin_stage("Preparing configuration", 1);
        stage
            .track("Binding configuration", self.assembler.bind_configuration())
            .await
            .map_err(|source| ConvergeError::Assembler {
                op: "binding configuration",
                source,
            })?;

        // VMs before instances: an instance reference may pin a VM.
        info!(plan = %self.plan.name, "deleting no longer needed vms");
        self.assembler
            .delete_unneeded_vms()
            .await
            .map_err(|source| ConvergeError::Assembler {
                op: "deleting unneeded vms",
                source,
            })?;

        info!(plan = %self.plan.name, "deleting no longer needed instances");
        self.assembler
            .delete_unneeded_instances()
            .await
            .map_err(|source| ConvergeError::Assembler {
                op: "deleting unneeded instances",
                source,
            })?;

        self.checkpoint(checkpoint)?;
        self.update_collections(checkpoint).await?;

        info!(plan = %self.plan.name, "refilling resource pools");
        self.pools.refill().await?;
        Ok(())
    }

    fn checkpoint(&self, checkpoint: &Checkpoint) -> ConvergeResult<()> {
        checkpoint
            .checkpoint()
            .map_err(|_| ConvergeError::Cancelled)
    }

    /// One worker per job collection, gated on dependency completion.
    async fn update_collections(&self, checkpoint: &Checkpoint) -> ConvergeResult<()> {
        let jobs = &self.plan.job_collections;
        if jobs.is_empty() {
            return Ok(());
        }

        info!(plan = %self.plan.name, collections = jobs.len(), "updating job collections");
        let gate = DependencyGate::new(PendingSet::build(jobs));
        let stage = Arc::new(
            self.event_log
                .begin_stage("Updating job collections", jobs.len()),
        );

        let mut workers: JoinSet<(String, WorkerOutcome)> = JoinSet::new();
        for job in jobs {
            let gate = gate.clone();
            let plan = Arc::clone(&self.plan);
            let updater = Arc::clone(&self.updater);
            let checkpoint = checkpoint.clone();
            let stage = Arc::clone(&stage);
            let job = job.clone();

            workers.spawn(async move {
                // Wait for dependencies, but stay responsive to a
                // cancellation that arrives while blocked.
                let wait = tokio::select! {
                    outcome = gate.wait_for(&job.depends_on) => Some(outcome),
                    _ = checkpoint.cancelled() => None,
                };

                let outcome = match wait {
                    None => {
                        gate.abandon(&job.name);
                        WorkerOutcome::Cancelled
                    }
                    Some(WaitOutcome::Blocked(dependency)) => {
                        warn!(job = %job.name, blocked_on = %dependency, "dependency will never complete, not starting");
                        gate.abandon(&job.name);
                        WorkerOutcome::Blocked { dependency }
                    }
                    Some(WaitOutcome::Ready) => {
                        // Checkpoint right before starting work; once the
                        // update begins it runs to its own completion.
                        if checkpoint.checkpoint().is_err() {
                            gate.abandon(&job.name);
                            WorkerOutcome::Cancelled
                        } else {
                            match stage.track(&job.name, updater.update(&plan, &job)).await {
                                Ok(()) => {
                                    gate.complete(&job.name);
                                    WorkerOutcome::Completed
                                }
                                Err(e) => {
                                    warn!(job = %job.name, error = %e, "job collection update failed");
                                    gate.abandon(&job.name);
                                    WorkerOutcome::Failed(e)
                                }
                            }
                        }
                    }
                };
                (job.name.clone(), outcome)
            });
        }

        // Every worker settles (success, failure, blocked, or cancelled)
        // before refill may run.
        let mut failed = Vec::new();
        let mut blocked = Vec::new();
        let mut cancelled = 0usize;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((name, WorkerOutcome::Completed)) => {
                    info!(job = %name, "job collection updated");
                }
                Ok((name, WorkerOutcome::Failed(e))) => {
                    failed.push(CollectionFailure {
                        name,
                        reason: e.to_string(),
                    });
                }
                Ok((name, WorkerOutcome::Blocked { .. })) => blocked.push(name),
                Ok((_, WorkerOutcome::Cancelled)) => cancelled += 1,
                Err(join_err) => {
                    failed.push(CollectionFailure {
                        name: "unknown".to_string(),
                        reason: format!("worker panicked: {join_err}"),
                    });
                }
            }
        }

        failed.sort_by(|a, b| a.name.cmp(&b.name));
        blocked.sort();

        if !failed.is_empty() {
            return Err(ConvergeError::CollectionsFailed { failed, blocked });
        }
        if cancelled > 0 || !blocked.is_empty() {
            return Err(ConvergeError::Cancelled);
        }
        Ok(())
    }
}
