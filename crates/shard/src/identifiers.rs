//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! a [`ContextId`] with a [`ScriptId`] even though both are strings under the
//! hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed (graph store / script cache names)
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a user instance in the graph store (e.g. `"U123"`).
    ///
    /// Assigned by the authority when a chat session is created; never minted
    /// by the gateway itself.
    UserId
}

string_id! {
    /// Identifies a shard (one graph engine instance) by its configured name.
    ShardName
}

string_id! {
    /// Identifies a conversation context within a [`crate::LangCache`].
    ///
    /// Trigger lookups are scoped to exactly one context.
    ContextId
}

string_id! {
    /// Identifies a reaction within a conversation context.
    ///
    /// A reaction id doubles as the id of the script it plays; see
    /// [`ReactionId::script_id`].
    ReactionId
}

string_id! {
    /// Identifies a script in the script cache.
    ScriptId
}

string_id! {
    /// Identifies a language cache (one per locale family) in the script cache file.
    LangCacheId
}

impl ContextId {
    /// Name of the context every new conversation starts in.
    pub const INITIAL: &'static str = "init";

    /// Returns the context every new conversation starts in.
    pub fn initial() -> Self {
        Self(Self::INITIAL.to_string())
    }
}

impl ReactionId {
    /// Returns the [`ScriptId`] this reaction resolves to.
    pub fn script_id(&self) -> ScriptId {
        ScriptId(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single inbound request.
///
/// Generated fresh for every request accepted by the HTTP surface; recorded on
/// the request span so all activity from one request can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a new random request identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — index-backed
// ---------------------------------------------------------------------------

/// Position of an executor handle within the worker pool.
///
/// Assigned once at pool construction; stable for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExecutorIndex(usize);

impl ExecutorIndex {
    /// Creates an index from its raw position.
    pub fn new(value: usize) -> Self {
        Self(value)
    }

    /// Returns the underlying position.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ExecutorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
