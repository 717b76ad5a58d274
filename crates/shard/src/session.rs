//! Chat sessions, token claims, and the rules for opening a session.
//!
//! A [`ChatSession`] lives for one request: it is built from the request's
//! headers (and, when authenticated, from verified [`Claims`]) and passed
//! explicitly to whatever handles the request. The gateway never persists it.

use serde::{Deserialize, Serialize};

use crate::errors::UserIdError;
use crate::{Locale, ShardName, UserId};

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// One conversation thread opened within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatThread {
    pub thread_id: String,
}

/// Per-request view of the client behind a chat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSession {
    /// Empty until the authority has registered the user.
    pub user_id: Option<UserId>,
    pub shard_id: Option<ShardName>,
    pub user_agent: String,
    pub user_ip: Option<String>,
    /// Accepted language tags, most preferred first.
    pub langs: Vec<String>,
    pub roles: Vec<String>,
    pub threads: Vec<ChatThread>,
}

impl ChatSession {
    /// Creates an anonymous session for a client.
    pub fn new(user_agent: impl Into<String>, user_ip: Option<String>, langs: Vec<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            user_ip,
            langs,
            ..Self::default()
        }
    }

    /// Returns this session with identity taken from verified claims.
    pub fn with_claims(mut self, claims: &Claims) -> Self {
        self.user_id = UserId::new(claims.user_id.clone());
        self.shard_id = ShardName::new(claims.shard_id.clone());
        self.roles = claims.roles.clone();
        self
    }

    /// Locale the client prefers: primary subtag of the first accepted
    /// language, or `en`.
    pub fn locale(&self) -> Locale {
        Locale::first_of(&self.langs)
    }
}

/// Parses an `Accept-Language` header into tags, most preferred first.
///
/// Entries are ordered by descending `q` weight (ties keep header order);
/// entries with `q=0` or an unparsable weight are dropped.
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut weighted: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() {
                return None;
            }
            let mut weight = 1.0_f32;
            for param in parts {
                if let Some(q) = param.trim().strip_prefix("q=") {
                    weight = q.trim().parse().ok()?;
                }
            }
            (weight > 0.0).then(|| (tag.to_string(), weight))
        })
        .collect();

    // sort_by is stable, so equal weights keep their header order.
    weighted.sort_by(|a, b| b.1.total_cmp(&a.1));
    weighted.into_iter().map(|(tag, _)| tag).collect()
}

// ---------------------------------------------------------------------------
// Token claims
// ---------------------------------------------------------------------------

/// Payload of a session token.
///
/// Never mutated after issuance; a new session requires a new token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry as seconds since the Unix epoch.
    pub exp: i64,
    #[serde(rename = "userid")]
    pub user_id: String,
    #[serde(rename = "shardid")]
    pub shard_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

// ---------------------------------------------------------------------------
// Peer shards
// ---------------------------------------------------------------------------

/// Whether a peer shard accepts new anonymous users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardAccess {
    Public,
    Private,
}

/// A peer shard known to the gateway.
///
/// The capacity fields are carried from configuration but are not used to
/// pick a shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ShardInfo {
    pub name: ShardName,
    pub access: ShardAccess,
    #[serde(default)]
    pub max_users: u64,
    #[serde(default)]
    pub max_sessions: u64,
}

/// Returns the first peer flagged public.
pub fn select_public_shard(peers: &[ShardInfo]) -> Option<&ShardInfo> {
    peers.iter().find(|peer| peer.access == ShardAccess::Public)
}

// ---------------------------------------------------------------------------
// Registration response parsing
// ---------------------------------------------------------------------------

/// Text that precedes a newly created user's id in the authority's
/// registration response.
pub const USER_INSTANCE_MARKER: &str = "{class User{!inst ";

/// Extracts the new user's id from the authority's registration response.
///
/// The id is every character after [`USER_INSTANCE_MARKER`] up to the first
/// `{`, `[` or space (or the end of the text).
pub fn extract_user_id(response: &str) -> Result<UserId, UserIdError> {
    let start = response
        .find(USER_INSTANCE_MARKER)
        .ok_or(UserIdError::MarkerNotFound)?
        + USER_INSTANCE_MARKER.len();
    let rest = &response[start..];
    let end = rest.find(['{', '[', ' ']).unwrap_or(rest.len());

    UserId::new(&rest[..end]).ok_or(UserIdError::Empty)
}
