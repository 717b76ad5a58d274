//! Commit forwarding: the phase state machine run after every local task.
//!
//! ```text
//!   local task done ──► phase != NeedsConfirm ──► serve local output (task type from phase)
//!                  └──► phase == NeedsConfirm ──► POST output to authority
//!                                                   ├─ 200  ──► serve authority body (task type "commit")
//!                                                   └─ else ──► CommitError (no local fallback, no retry)
//! ```
//!
//! The local engine alone decides readiness; the authority applies or rejects
//! the write atomically in a single round.

use std::sync::Arc;

use shard::{AuthorityClient, AuthorityError, TaskResult, TaskType};
use thiserror::Error;
use tracing::{info, warn};

/// The authority did not ratify a write.
///
/// The caller must resubmit; nothing was applied locally on its behalf.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Commit failed: {source}")]
pub struct CommitError {
    #[from]
    pub source: AuthorityError,
}

/// Final response for a graph task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Body to serve: local output, or the authority's response to a commit.
    pub body: String,
    pub task_type: TaskType,
}

/// Forwards writes that need ratification to the authority node.
#[derive(Clone)]
pub struct CommitForwarder {
    authority: Arc<dyn AuthorityClient>,
}

impl CommitForwarder {
    pub fn new(authority: Arc<dyn AuthorityClient>) -> Self {
        Self { authority }
    }

    /// Decides what to serve for a locally completed task.
    pub async fn resolve(&self, result: TaskResult) -> Result<Resolution, CommitError> {
        if !result.phase.requires_confirmation() {
            return Ok(Resolution {
                body: result.output,
                task_type: result.phase.task_type(),
            });
        }

        info!("Task requires confirmation; forwarding to authority");
        let body = self.forward(&result.output).await?;
        Ok(Resolution {
            body,
            task_type: TaskType::Commit,
        })
    }

    /// Submits task text straight to the authority and returns its response.
    ///
    /// Used for writes that are always remote (session registration,
    /// statements) as well as for ratifying local results.
    pub async fn forward(&self, task: &str) -> Result<String, CommitError> {
        self.authority.submit(task).await.map_err(|source| {
            warn!(error = %source, "Authority did not accept the commit");
            CommitError { source }
        })
    }
}

impl std::fmt::Debug for CommitForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitForwarder").finish_non_exhaustive()
    }
}
