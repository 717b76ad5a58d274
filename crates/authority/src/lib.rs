//! Authority node client adapter.
//!
//! Implements [`shard::AuthorityClient`] over the authority's task endpoint:
//! `POST {base}/gsl` with the raw task text as a `text/plain; charset=utf-8`
//! body. Anything but `200 OK` is a rejection, even when a body comes back.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport, timeouts and status handling live here. The
//! `dispatch` crate sees only [`shard::AuthorityClient`].
//!
//! Submissions are never retried: a write is applied or rejected by the
//! authority in one round and the caller decides whether to resubmit.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use shard::{AuthorityClient, AuthorityError};
use thiserror::Error;
use tracing::{debug, instrument};

/// Request timeout for every submission.
pub const COMMIT_TIMEOUT: Duration = Duration::from_secs(7);

const TASK_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// The HTTP client could not be constructed.
#[derive(Debug, Error)]
#[error("Failed to build authority HTTP client: {0}")]
pub struct ClientBuildError(#[from] reqwest::Error);

/// [`AuthorityClient`] speaking HTTP to the authority node.
#[derive(Debug, Clone)]
pub struct HttpAuthorityClient {
    endpoint: String,
    http: Client,
}

impl HttpAuthorityClient {
    /// Creates a client for the authority at `base_url`, e.g.
    /// `http://authority:8090`.
    pub fn new(base_url: &str) -> Result<Self, ClientBuildError> {
        Self::with_timeout(base_url, COMMIT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientBuildError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: format!("{}/gsl", base_url.trim_end_matches('/')),
            http,
        })
    }

    /// Full URL submissions are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AuthorityClient for HttpAuthorityClient {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, task_len = task.len()))]
    async fn submit(&self, task: &str) -> Result<String, AuthorityError> {
        let unreachable = |err: reqwest::Error| AuthorityError::Unreachable {
            message: err.to_string(),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, TASK_CONTENT_TYPE)
            .body(task.to_string())
            .send()
            .await
            .map_err(unreachable)?;

        let status = response.status();
        let body = response.text().await.map_err(unreachable)?;
        if status != StatusCode::OK {
            return Err(AuthorityError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(body_len = body.len(), "Authority accepted task");
        Ok(body)
    }
}
