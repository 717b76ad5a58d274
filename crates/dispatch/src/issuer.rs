//! Session issuance.
//!
//! Opening a session is always a remote write: the user is registered on the
//! authority, the new user id is read back out of the authority's response,
//! and a signed token is issued for it. A client that already presents a
//! valid token is only validated, never re-registered.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use shard::{
    extract_user_id, gsl, select_public_shard, ChatSession, Claims, SessionCookie, ShardInfo,
    TokenError, TokenSigner, UserIdError,
};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::commit::{CommitError, CommitForwarder};

/// Why a session could not be opened or validated.
///
/// Clients see one generic message for every creation failure; the variants
/// exist so logs tell them apart.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No public shard available")]
    NoPublicShard,

    #[error("User registration failed: {0}")]
    Registration(#[source] CommitError),

    #[error("User id not found in registration response: {0}")]
    UserId(#[source] UserIdError),

    #[error("Session token could not be signed: {0}")]
    Signing(#[source] TokenError),

    #[error("Session token rejected: {0}")]
    InvalidToken(#[source] TokenError),
}

/// Fixed parameters of every issued session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Lifetime of a token from the moment it is signed.
    pub token_expiry: TimeDelta,
    /// Domain the session cookie is scoped to.
    pub service_domain: String,
    /// Roles granted to new users.
    pub roles: Vec<String>,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            token_expiry: TimeDelta::hours(24),
            service_domain: "localhost".to_string(),
            roles: vec!["user".to_string()],
        }
    }
}

/// A freshly opened session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: String,
    pub cookies: Vec<SessionCookie>,
    /// The session with its new identity filled in.
    pub session: ChatSession,
}

/// Registers users and issues their session tokens.
#[derive(Clone)]
pub struct SessionIssuer {
    peers: Arc<[ShardInfo]>,
    forwarder: CommitForwarder,
    signer: Arc<dyn TokenSigner>,
    policy: SessionPolicy,
}

impl SessionIssuer {
    pub fn new(
        peers: Vec<ShardInfo>,
        forwarder: CommitForwarder,
        signer: Arc<dyn TokenSigner>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            peers: peers.into(),
            forwarder,
            signer,
            policy,
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Opens a new session for an anonymous client.
    pub async fn create(&self, session: ChatSession) -> Result<IssuedSession, SessionError> {
        self.create_at(session, Utc::now()).await
    }

    /// Opens a new session as of `now`.
    #[instrument(skip_all, fields(user_agent = %session.user_agent))]
    pub async fn create_at(
        &self,
        mut session: ChatSession,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, SessionError> {
        let shard = select_public_shard(&self.peers).ok_or_else(|| {
            error!(peers = self.peers.len(), "Session setup failed: no public shard");
            SessionError::NoPublicShard
        })?;

        let response = self
            .forwarder
            .forward(&gsl::register_user_task(&session))
            .await
            .map_err(|err| {
                error!(error = %err, "Session setup failed: user registration was not committed");
                SessionError::Registration(err)
            })?;

        let user_id = extract_user_id(&response).map_err(|err| {
            error!(error = %err, response_len = response.len(), "Session setup failed: no user id in response");
            SessionError::UserId(err)
        })?;

        let claims = Claims {
            exp: now
                .checked_add_signed(self.policy.token_expiry)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
                .timestamp(),
            user_id: user_id.to_string(),
            shard_id: shard.name.to_string(),
            roles: self.policy.roles.clone(),
        };
        let token = self.signer.sign(&claims).map_err(|err| {
            error!(error = %err, "Session setup failed: token signing");
            SessionError::Signing(err)
        })?;

        info!(user = %user_id, shard = %shard.name, "Session opened");
        session = session.with_claims(&claims);
        let cookie = SessionCookie::session(token.clone(), &self.policy.service_domain, now);
        Ok(IssuedSession {
            token,
            cookies: vec![cookie],
            session,
        })
    }

    /// Checks a presented token and returns its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, SessionError> {
        self.signer.verify(token).map_err(|err| {
            warn!(error = %err, "Session token rejected");
            SessionError::InvalidToken(err)
        })
    }
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("peers", &self.peers.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
