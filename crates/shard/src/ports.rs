//! Port traits implemented by the infrastructure crates.
//!
//! The gateway core talks to every external collaborator through one of these
//! narrow request/response contracts. Nothing here knows about HTTP, JWT
//! libraries, or any native engine ABI: the `engine`, `authority`,
//! `linguistic` and `tokens` crates supply the concrete implementations, and
//! tests supply in-memory fakes.

use async_trait::async_trait;

use crate::errors::{AuthorityError, ExecutionError, LinguisticError, TokenError};
use crate::session::Claims;
use crate::types::{Locale, TaskOutput};

// ---------------------------------------------------------------------------
// Graph engine
// ---------------------------------------------------------------------------

/// One single-threaded execution context of the graph engine.
///
/// Implementations are stateful between calls and are never shared: the
/// worker pool hands each context to exactly one request at a time and calls
/// [`TaskExecutor::reset`] before every use.
#[async_trait]
pub trait TaskExecutor: Send {
    /// Runs one task and returns the engine's output, phase and status code.
    ///
    /// A non-zero status code is reported inside [`TaskOutput`], not as an
    /// `Err`; `Err` is reserved for failing to reach the context at all.
    async fn execute(&mut self, task: &str) -> Result<TaskOutput, ExecutionError>;

    /// Discards all per-call state left over from the previous task.
    fn reset(&mut self);
}

// ---------------------------------------------------------------------------
// Authority node
// ---------------------------------------------------------------------------

/// The node empowered to ratify writes.
///
/// A submission is a single round: the authority applies or rejects the task
/// atomically and its response body becomes the final result.
#[async_trait]
pub trait AuthorityClient: Send + Sync {
    /// Submits raw task text and returns the authority's response body.
    async fn submit(&self, task: &str) -> Result<String, AuthorityError>;
}

// ---------------------------------------------------------------------------
// Linguistic service
// ---------------------------------------------------------------------------

/// Result of decoding free text into graph form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Graph representation of the utterance.
    pub graph: String,
    /// Raw discourse classification string reported by the service.
    pub discourse_type: String,
}

/// Text-to-graph and graph-to-text conversion.
#[async_trait]
pub trait LinguisticService: Send + Sync {
    /// Decodes free text in `locale` into its graph representation.
    async fn decode(&self, text: &str, locale: &Locale) -> Result<Decoded, LinguisticError>;

    /// Encodes graph text back into natural language for `locale`.
    async fn encode(&self, graph: &str, locale: &Locale) -> Result<String, LinguisticError>;
}

// ---------------------------------------------------------------------------
// Session tokens
// ---------------------------------------------------------------------------

/// Signs and verifies session token claims.
///
/// The signature algorithm is an implementation choice of the adapter.
pub trait TokenSigner: Send + Sync {
    /// Signs `claims` into an opaque token string.
    fn sign(&self, claims: &Claims) -> Result<String, TokenError>;

    /// Verifies `token` (signature and expiry) and returns its claims.
    fn verify(&self, token: &str) -> Result<Claims, TokenError>;
}
