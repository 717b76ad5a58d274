//! Graph task dispatch: pool checkout, local execution, commit forwarding.

use shard::ExecutionError;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::commit::{CommitError, CommitForwarder, Resolution};
use crate::pool::{PoolError, WorkerPool};

/// Why a graph task produced no result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// No execution context could be checked out.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The local engine failed the task.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The task needed ratification and the authority did not give it.
    #[error(transparent)]
    Commit(#[from] CommitError),
}

/// Runs graph tasks on the worker pool and resolves their phase.
#[derive(Debug, Clone)]
pub struct TaskDispatcher {
    pool: WorkerPool,
    forwarder: CommitForwarder,
}

impl TaskDispatcher {
    pub fn new(pool: WorkerPool, forwarder: CommitForwarder) -> Self {
        Self { pool, forwarder }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn forwarder(&self) -> &CommitForwarder {
        &self.forwarder
    }

    /// Executes `task` on an exclusive context and returns what to serve.
    ///
    /// The context goes back to the pool as soon as the local call finishes,
    /// before any authority round trip.
    #[instrument(skip_all, fields(task_len = task.len()))]
    pub async fn run(&self, task: &str) -> Result<Resolution, DispatchError> {
        let local = {
            let mut handle = self.pool.checkout().await?;
            handle.run(task).await
        };
        let local = local.inspect_err(|err| warn!(error = %err, "Task execution failed"))?;

        let resolution = self.forwarder.resolve(local).await?;
        info!(task_type = %resolution.task_type, "Task completed");
        Ok(resolution)
    }
}
