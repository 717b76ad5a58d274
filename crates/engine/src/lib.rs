//! Graph engine adapter.
//!
//! Implements [`shard::TaskExecutor`] over the engine's HTTP task endpoint.
//! Each [`HttpTaskExecutor`] addresses one execution context on the engine by
//! its index; the worker pool owns one executor per context.
//!
//! ## Wire contract
//!
//! `POST {base}/task` with the task text as a `text/plain` body and headers:
//!
//! | Request header | Meaning |
//! |----------------|---------|
//! | `X-Task-Context` | Index of the execution context |
//! | `X-Task-Reset` | `1` when the context must drop state from earlier calls |
//!
//! The response body is the task output. The engine reports the phase in
//! `X-Task-Phase` (`get`, `select`, `update`, `confirm`) and its status code in
//! `X-Task-Error` (absent means `0`). A non-zero code is a task failure, not a
//! transport failure, and is returned inside [`TaskOutput`].

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use shard::{ExecutionError, ExecutorIndex, TaskExecutor, TaskOutput, TaskPhase};
use thiserror::Error;
use tracing::{debug, instrument};

pub const PHASE_HEADER: &str = "x-task-phase";
pub const ERROR_HEADER: &str = "x-task-error";
pub const CONTEXT_HEADER: &str = "x-task-context";
pub const RESET_HEADER: &str = "x-task-reset";

/// The HTTP client could not be constructed.
#[derive(Debug, Error)]
#[error("Failed to build engine HTTP client: {0}")]
pub struct ClientBuildError(#[from] reqwest::Error);

/// Connection to the graph engine shared by all of its executors.
#[derive(Debug, Clone)]
pub struct EngineClient {
    endpoint: String,
    http: Client,
}

impl EngineClient {
    /// Creates a client for the engine at `base_url`.
    ///
    /// No request timeout is set: a task runs to completion on its own terms.
    pub fn new(base_url: &str) -> Result<Self, ClientBuildError> {
        let http = Client::builder().build()?;
        Ok(Self {
            endpoint: format!("{}/task", base_url.trim_end_matches('/')),
            http,
        })
    }

    /// Builds `count` executors, one per execution context.
    pub fn executors(&self, count: usize) -> Vec<Box<dyn TaskExecutor>> {
        (0..count)
            .map(|i| Box::new(self.executor(ExecutorIndex::new(i))) as Box<dyn TaskExecutor>)
            .collect()
    }

    pub fn executor(&self, index: ExecutorIndex) -> HttpTaskExecutor {
        HttpTaskExecutor {
            client: self.clone(),
            index,
            pending_reset: true,
            last_output: String::new(),
        }
    }
}

/// One execution context on the engine.
#[derive(Debug)]
pub struct HttpTaskExecutor {
    client: EngineClient,
    index: ExecutorIndex,
    pending_reset: bool,
    last_output: String,
}

impl HttpTaskExecutor {
    pub fn index(&self) -> ExecutorIndex {
        self.index
    }

    /// Output of the last call on this context; empty after a reset.
    pub fn last_output(&self) -> &str {
        &self.last_output
    }
}

#[async_trait]
impl TaskExecutor for HttpTaskExecutor {
    #[instrument(skip_all, fields(executor = %self.index))]
    async fn execute(&mut self, task: &str) -> Result<TaskOutput, ExecutionError> {
        let unavailable = |message: String| ExecutionError::Unavailable { message };

        let mut request = self
            .client
            .http
            .post(&self.client.endpoint)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .header(CONTEXT_HEADER, self.index.as_usize().to_string());
        if self.pending_reset {
            request = request.header(RESET_HEADER, "1");
        }

        let response = request
            .body(task.to_string())
            .send()
            .await
            .map_err(|err| unavailable(err.to_string()))?;
        self.pending_reset = false;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("engine returned status {status}")));
        }
        let phase = response
            .headers()
            .get(PHASE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(TaskPhase::parse)
            .unwrap_or(TaskPhase::Other);
        let error_code = match response.headers().get(ERROR_HEADER) {
            None => 0,
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<i32>().ok())
                .ok_or_else(|| unavailable("malformed task status header".to_string()))?,
        };
        let output = response
            .text()
            .await
            .map_err(|err| unavailable(err.to_string()))?;

        debug!(%phase, error_code, output_len = output.len(), "Task executed");
        self.last_output.clone_from(&output);
        Ok(TaskOutput {
            output,
            phase,
            error_code,
        })
    }

    fn reset(&mut self) {
        self.last_output.clear();
        self.pending_reset = true;
    }
}
