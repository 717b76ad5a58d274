//! Core domain for the Aide gateway.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, and port trait used by the gateway. Infrastructure crates implement
//! the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* the gateway needs from the graph engine, the authority
//! node, the linguistic service and the token signer; infrastructure crates
//! define *how* to reach them.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`UserId`, `ContextId`, `ScriptId`, etc.) |
//! | [`types`] | Value types (`TaskPhase`, `TaskType`, `Locale`, `DiscourseType`) |
//! | [`errors`] | Errors of the external collaborators and startup data |
//! | [`ports`] | Port traits (`TaskExecutor`, `AuthorityClient`, `LinguisticService`, `TokenSigner`) |
//! | [`script`] | Script cache data model |
//! | [`trigger_cache`] | Immutable trigger-phrase index and cached replies |
//! | [`session`] | Chat sessions, token claims, peer shards, user-id extraction |
//! | [`cookie`] | The `sid` session cookie |
//! | [`message`] | A single chat turn |
//! | [`gsl`] | Builders for gateway-generated task text |

pub mod cookie;
pub mod errors;
pub mod gsl;
pub mod identifiers;
pub mod message;
pub mod ports;
pub mod script;
pub mod session;
pub mod trigger_cache;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use cookie::{find_cookie, SessionCookie, SESSION_COOKIE_NAME};
pub use errors::{
    AuthorityError, CacheBuildError, ExecutionError, LinguisticError, TokenError, UserIdError,
};
pub use identifiers::{
    ContextId, ExecutorIndex, LangCacheId, ReactionId, RequestId, ScriptId, ShardName, UserId,
};
pub use message::Message;
pub use ports::{AuthorityClient, Decoded, LinguisticService, TaskExecutor, TokenSigner};
pub use script::{CacheFile, LangCache, Script, ScriptCtx, ScriptPhase, ScriptReact};
pub use session::{
    extract_user_id, parse_accept_language, select_public_shard, ChatSession, ChatThread, Claims,
    ShardAccess, ShardInfo,
};
pub use trigger_cache::{CacheReply, MenuItem, TriggerCache, TriggerEntry};
pub use types::{DiscourseType, Locale, TaskOutput, TaskPhase, TaskResult, TaskType};
