//! StateStore — redb-backed persistence for plans and task records.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use drift_plan::DeploymentPlan;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(PLANS).map_err(map_err!(Table))?;
        txn.open_table(TASKS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Plans ──────────────────────────────────────────────────────

    /// Insert or update a deployment plan, keyed by its name.
    pub fn put_plan(&self, plan: &DeploymentPlan) -> StateResult<()> {
        let value = serde_json::to_vec(plan).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(PLANS).map_err(map_err!(Table))?;
            table
                .insert(plan.name.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(plan = %plan.name, "plan stored");
        Ok(())
    }

    /// Get a plan by name.
    pub fn get_plan(&self, name: &str) -> StateResult<Option<DeploymentPlan>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PLANS).map_err(map_err!(Table))?;
        match table.get(name).map_err(map_err!(Read))? {
            Some(guard) => {
                let plan: DeploymentPlan =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(plan))
            }
            None => Ok(None),
        }
    }

    /// List all stored plans.
    pub fn list_plans(&self) -> StateResult<Vec<DeploymentPlan>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PLANS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let plan: DeploymentPlan =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(plan);
        }
        Ok(results)
    }

    /// Delete a plan by name. Returns true if it existed.
    pub fn delete_plan(&self, name: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(PLANS).map_err(map_err!(Table))?;
            existed = table.remove(name).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }

    // ── Tasks ──────────────────────────────────────────────────────

    /// Insert or update a task record.
    pub fn put_task(&self, record: &TaskRecord) -> StateResult<()> {
        let key = TaskRecord::table_key(record.id);
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(TASKS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(task = record.id, state = ?record.state, "task stored");
        Ok(())
    }

    /// Get a task record by id.
    pub fn get_task(&self, id: TaskId) -> StateResult<Option<TaskRecord>> {
        let key = TaskRecord::table_key(id);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(TASKS).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: TaskRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// List all task records in id order.
    pub fn list_tasks(&self) -> StateResult<Vec<TaskRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(TASKS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: TaskRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        Ok(results)
    }

    /// Transition a task to a new state, optionally recording a result
    /// message. Fails with `NotFound` for an unknown id.
    pub fn update_task_state(
        &self,
        id: TaskId,
        state: TaskState,
        result: Option<String>,
    ) -> StateResult<()> {
        let mut record = self
            .get_task(id)?
            .ok_or_else(|| StateError::NotFound(format!("task {id}")))?;
        record.state = state;
        if result.is_some() {
            record.result = result;
        }
        self.put_task(&record)
    }

    /// Highest task id stored so far, or 0 when the table is empty.
    pub fn max_task_id(&self) -> StateResult<TaskId> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(TASKS).map_err(map_err!(Table))?;
        match table.last().map_err(map_err!(Read))? {
            Some((_, value)) => {
                let record: TaskRecord =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                Ok(record.id)
            }
            None => Ok(0),
        }
    }
}
