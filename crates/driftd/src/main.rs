//! driftd — the drift convergence daemon.
//!
//! Single binary around the convergence engine:
//! - `validate` — parse and structurally validate a plan file
//! - `deploy` — run a convergence as a queued task against the simulated
//!   cloud provider (Ctrl-C requests cooperative cancellation)
//! - `tasks` — list persisted task records
//!
//! # Usage
//!
//! ```text
//! driftd deploy plan.toml --data-dir /var/lib/drift
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use drift_cloud::SimCloud;
use drift_converge::{Coordinator, ConvergeError, NoopAssembler};
use drift_plan::DeploymentPlan;
use drift_pool::ResourcePools;
use drift_state::{StateStore, TaskKind, TaskState};
use drift_tasks::{TaskError, TaskQueue};
use drift_update::RollingUpdater;

#[derive(Parser)]
#[command(name = "driftd", about = "Drift deployment convergence daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse and validate a deployment plan file.
    Validate {
        /// Path to the plan TOML file.
        plan: PathBuf,
    },

    /// Converge a deployment plan (against the simulated provider).
    Deploy {
        /// Path to the plan TOML file.
        plan: PathBuf,

        /// Data directory for persistent state.
        #[arg(long, default_value = "/var/lib/drift")]
        data_dir: PathBuf,

        /// Requesting user recorded on the task.
        #[arg(long, default_value = "admin")]
        user: String,
    },

    /// List task records.
    Tasks {
        /// Data directory for persistent state.
        #[arg(long, default_value = "/var/lib/drift")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,driftd=debug,drift=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Validate { plan } => validate(plan),
        Command::Deploy {
            plan,
            data_dir,
            user,
        } => deploy(plan, data_dir, user).await,
        Command::Tasks { data_dir } => list_tasks(data_dir),
    }
}

fn validate(path: PathBuf) -> anyhow::Result<()> {
    let plan = DeploymentPlan::from_file(&path)?;
    drift_plan::validate(&plan)?;
    println!(
        "plan '{}' ok: {} job collection(s), {} resource pool(s)",
        plan.name,
        plan.job_collections.len(),
        plan.resource_pools.len()
    );
    Ok(())
}

async fn deploy(path: PathBuf, data_dir: PathBuf, user: String) -> anyhow::Result<()> {
    let plan = DeploymentPlan::from_file(&path)?;
    drift_plan::validate(&plan)?;

    std::fs::create_dir_all(&data_dir)?;
    let store = StateStore::open(&data_dir.join("drift.redb"))?;
    store.put_plan(&plan)?;

    // Assemble the engine over the simulated provider.
    let cloud = Arc::new(SimCloud::new());
    let pools = Arc::new(ResourcePools::new(cloud.clone(), &plan.resource_pools));
    let updater = Arc::new(RollingUpdater::new(cloud.clone(), pools.clone()));
    let coordinator = Arc::new(Coordinator::new(
        Arc::new(plan.clone()),
        pools,
        updater,
        Arc::new(NoopAssembler),
    ));

    let queue = TaskQueue::new(store.clone())?;
    let description = format!("converge deployment '{}'", plan.name);
    let handle = queue.enqueue(&user, TaskKind::Converge, &description, move |checkpoint| {
        Box::pin(async move {
            coordinator.run(&checkpoint).await.map_err(|e| match e {
                ConvergeError::Cancelled => TaskError::Cancelled,
                other => TaskError::Failed(other.to_string()),
            })
        })
    })?;

    info!(task = handle.id, plan = %plan.name, "convergence enqueued");

    // Ctrl-C requests cooperative cancellation; the run stops at its next
    // checkpoint.
    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("cancellation requested");
            canceller.cancel();
        }
    });

    let record = handle.wait(&store).await?;
    match record.state {
        TaskState::Done => {
            println!("task {}: done", record.id);
            Ok(())
        }
        state => {
            let detail = record.result.unwrap_or_default();
            println!("task {}: {state:?}: {detail}", record.id);
            std::process::exit(1);
        }
    }
}

fn list_tasks(data_dir: PathBuf) -> anyhow::Result<()> {
    let store = StateStore::open(&data_dir.join("drift.redb"))?;
    let tasks = store.list_tasks()?;
    if tasks.is_empty() {
        println!("no tasks");
        return Ok(());
    }
    for task in tasks {
        println!(
            "{:>6}  {:<10} {:?}  {}  {}",
            task.id,
            task.user,
            task.state,
            task.description,
            task.result.unwrap_or_default()
        );
    }
    Ok(())
}
