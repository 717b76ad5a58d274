//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use dispatch::{AdmissionRejected, DispatchError, MessageError, PoolError, SessionError};
use shard::ExecutionError;
use thiserror::Error;
use tracing::error;

/// Every way a request can fail at the HTTP boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Busy(#[from] AdmissionRejected),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("invalid SID")]
    InvalidSid,

    /// A `/query` task failed; the engine's partial output is returned to the
    /// client.
    #[error("query failed")]
    QueryFailed(#[source] ExecutionError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The task serving the request panicked or was cancelled.
    #[error("request aborted: {0}")]
    Aborted(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Busy(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) | Self::InvalidSid | Self::QueryFailed(_) => StatusCode::BAD_REQUEST,
            Self::Dispatch(DispatchError::Pool(PoolError::Closed)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Dispatch(DispatchError::Commit(_)) => StatusCode::BAD_GATEWAY,
            Self::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Message(MessageError::AnonymousStatement) => StatusCode::FORBIDDEN,
            Self::Message(_) => StatusCode::BAD_GATEWAY,
            Self::Session(_) | Self::Aborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, %status, "Request failed");
        }
        match self {
            Self::Busy(_) => (status, "server is busy").into_response(),
            Self::QueryFailed(err) => (
                status,
                Json(serde_json::json!({ "error": err.partial_output() })),
            )
                .into_response(),
            Self::Dispatch(DispatchError::Execution(err)) => {
                (status, format!("task execution failed: {}", err.partial_output())).into_response()
            }
            Self::Session(_) => (status, "failed to open a session").into_response(),
            Self::Aborted(_) => (status, "request aborted").into_response(),
            other => (status, other.to_string()).into_response(),
        }
    }
}
