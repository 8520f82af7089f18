//! Execution registry.
//!
//! Owns running executions by ID. `finish` removes the execution from the map
//! and performs the `Running -> Done` transition on the removed value, so
//! concurrent finishes of the same execution race for one removal, the
//! completion hook fires exactly once, and finished executions do not
//! accumulate.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use jobstats_core::{Execution, ExecutionId};
use jobstats_persistence::CounterStore;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{RegistryError, RegistryResult};
use crate::hook::{CompletionHook, CompletionReport};

pub struct ExecutionRegistry<S> {
    executions: DashMap<ExecutionId, Execution>,
    hook: CompletionHook<S>,
}

impl<S: CounterStore> ExecutionRegistry<S> {
    pub fn new(hook: CompletionHook<S>) -> Self {
        Self {
            executions: DashMap::new(),
            hook,
        }
    }

    /// Register a new running execution of `job_name`.
    pub fn start(&self, job_name: impl Into<String>, started_at: DateTime<Utc>) -> ExecutionId {
        self.track(Execution::start(job_name, started_at))
    }

    /// Register a prebuilt execution (e.g. one carrying a node name).
    ///
    /// Only running executions are accepted.
    pub fn insert(&self, execution: Execution) -> RegistryResult<ExecutionId> {
        if execution.is_done() {
            return Err(RegistryError::AlreadyFinished(execution.id));
        }
        Ok(self.track(execution))
    }

    fn track(&self, execution: Execution) -> ExecutionId {
        let id = execution.id;
        info!(execution_id = %id, job_name = %execution.job_name, "Execution started");
        self.executions.insert(id, execution);
        id
    }

    /// Snapshot of a running execution.
    pub fn get(&self, id: &ExecutionId) -> Option<Execution> {
        self.executions.get(id).map(|e| e.clone())
    }

    /// Number of executions still running.
    pub fn running(&self) -> usize {
        self.executions.len()
    }

    /// Move an execution into the done state, drop it from the registry and
    /// fire the completion hook.
    ///
    /// Finishing an execution that is no longer registered, including one
    /// that already finished, yields `NotFound`. The transition is not rolled
    /// back if recording the stat fails; the failure is carried in the
    /// returned report.
    pub async fn finish(
        &self,
        ctx: &CancellationToken,
        id: ExecutionId,
        finished_at: DateTime<Utc>,
        success: bool,
    ) -> RegistryResult<CompletionReport> {
        let (_, mut execution) = self
            .executions
            .remove(&id)
            .ok_or(RegistryError::NotFound(id))?;
        if !execution.complete(finished_at, success) {
            return Err(RegistryError::AlreadyFinished(id));
        }

        info!(
            execution_id = %id,
            job_name = %execution.job_name,
            node_name = execution.node_name.as_deref().unwrap_or("-"),
            state = %execution.state,
            "Execution finished"
        );
        Ok(self.hook.on_execution_done(ctx, &execution).await?)
    }
}
