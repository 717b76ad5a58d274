//! Error types for the gateway's external collaborators and startup data.
//!
//! Each port trait in [`crate::ports`] has its own error type so failures stay
//! distinguishable all the way to the request boundary: an engine failure, an
//! authority failure and a linguistic-service failure are never collapsed into
//! one another. Orchestration-level errors (admission, dispatch, sessions) are
//! defined in the `dispatch` crate and wrap these.
//!
//! None of these errors is retried inside the gateway.

use thiserror::Error;

use crate::{ContextId, ReactionId, ScriptId};

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Failure of a task on an execution context.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    /// The engine ran the task and reported a non-zero status code.
    ///
    /// `partial_output` carries whatever the engine wrote before failing; it
    /// is returned to the caller for diagnostics.
    #[error("Task execution failed with code {code}")]
    Failed {
        /// Engine status code.
        code: i32,
        /// Output produced before the failure.
        partial_output: String,
    },

    /// The execution context could not be reached at all.
    #[error("Execution context unavailable: {message}")]
    Unavailable {
        /// Description of the transport failure.
        message: String,
    },
}

impl ExecutionError {
    /// Returns the engine's partial output, if any was produced.
    pub fn partial_output(&self) -> &str {
        match self {
            Self::Failed { partial_output, .. } => partial_output,
            Self::Unavailable { .. } => "",
        }
    }
}

// ---------------------------------------------------------------------------
// Authority
// ---------------------------------------------------------------------------

/// Failure of a write forwarded to the authority node.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthorityError {
    /// The authority could not be reached or did not answer in time.
    #[error("Authority unreachable: {message}")]
    Unreachable {
        /// Description of the transport failure.
        message: String,
    },

    /// The authority answered with a non-success status.
    ///
    /// The body is kept for logs only; it is never served as a result.
    #[error("Authority rejected the task with status {status}")]
    Rejected {
        /// HTTP status code returned by the authority.
        status: u16,
        /// Response body returned alongside the status.
        body: String,
    },
}

// ---------------------------------------------------------------------------
// Linguistic service
// ---------------------------------------------------------------------------

/// Failure of a decode or encode call to the linguistic service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinguisticError {
    /// The service could not be reached or did not answer in time.
    #[error("Linguistic service unreachable: {message}")]
    Unreachable {
        /// Description of the transport failure.
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("Linguistic service returned status {status}")]
    Status {
        /// HTTP status code returned by the service.
        status: u16,
        /// Response body returned alongside the status.
        body: String,
    },
}

// ---------------------------------------------------------------------------
// Session tokens
// ---------------------------------------------------------------------------

/// Failure to sign or verify a session token.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The claims could not be signed.
    #[error("Token signing failed: {message}")]
    Signing {
        /// Description of the signing failure.
        message: String,
    },

    /// The token is malformed, expired, or carries an invalid signature.
    #[error("Invalid token: {message}")]
    Invalid {
        /// Description of the verification failure.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Startup data
// ---------------------------------------------------------------------------

/// Failure to build the trigger cache from the script cache file.
///
/// Always fatal: the gateway never starts with a missing or corrupt cache.
#[derive(Debug, Error)]
pub enum CacheBuildError {
    /// The cache file is not valid JSON or does not match the expected shape.
    #[error("Script cache could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two scripts share the same id.
    #[error("Duplicate script '{script}' in script cache")]
    DuplicateScript {
        /// The repeated script id.
        script: ScriptId,
    },

    /// A reaction names a script that does not exist.
    #[error("Reaction '{reaction}' in context '{context}' references an unknown script")]
    UnknownScript {
        /// Context holding the reaction.
        context: ContextId,
        /// The dangling reaction.
        reaction: ReactionId,
    },

    /// A script reachable from a trigger has no `init` phase to answer with.
    #[error("Script '{script}' has no init phase")]
    MissingInitPhase {
        /// The incomplete script.
        script: ScriptId,
    },
}

// ---------------------------------------------------------------------------
// Authority response parsing
// ---------------------------------------------------------------------------

/// Failure to find the new user's id in the authority's registration response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    /// The response does not contain the user-instance marker.
    #[error("User instance marker not found in authority response")]
    MarkerNotFound,

    /// The marker is present but no id follows it.
    #[error("Empty user id in authority response")]
    Empty,
}
