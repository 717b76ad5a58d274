//! Shared value types for the gateway domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (a locale is always a lowercase primary
//! subtag, a phase always maps to exactly one task type) and participate in
//! routing decisions.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Task phases
// ---------------------------------------------------------------------------

/// What a completed task requires next, as reported by the graph engine.
///
/// Every phase except [`TaskPhase::NeedsConfirm`] is served locally. A task
/// that ends in `NeedsConfirm` produced a write that only becomes durable once
/// the authority node ratifies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    /// A read of a single entity.
    Get,
    /// A selection over a set of entities.
    Select,
    /// A local update that needs no ratification.
    Update,
    /// A write that must be forwarded to the authority before it is durable.
    NeedsConfirm,
    /// Any phase the gateway has no label for; served locally.
    Other,
}

impl TaskPhase {
    /// Parses the engine's wire name for a phase.
    ///
    /// Unrecognised names map to [`TaskPhase::Other`] rather than failing: an
    /// unknown phase is still a completed task whose output can be served.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "get" => Self::Get,
            "select" => Self::Select,
            "update" => Self::Update,
            "confirm" | "needs_confirm" => Self::NeedsConfirm,
            _ => Self::Other,
        }
    }

    /// Returns the wire name of this phase.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Select => "select",
            Self::Update => "update",
            Self::NeedsConfirm => "confirm",
            Self::Other => "other",
        }
    }

    /// Returns `true` if the output must be ratified by the authority.
    pub fn requires_confirmation(self) -> bool {
        matches!(self, Self::NeedsConfirm)
    }

    /// Returns the informational label recorded for a task ending in this phase.
    pub fn task_type(self) -> TaskType {
        match self {
            Self::Get => TaskType::Get,
            Self::Select => TaskType::Select,
            Self::Update => TaskType::Update,
            Self::NeedsConfirm => TaskType::Commit,
            Self::Other => TaskType::Unknown,
        }
    }
}

impl std::fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Informational label attached to every completed graph task.
///
/// Only used for observability; routing decisions are made on [`TaskPhase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Get,
    Select,
    Update,
    Commit,
    Unknown,
}

impl TaskType {
    /// Returns the label as a string slice.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Select => "select",
            Self::Update => "update",
            Self::Commit => "commit",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Task outputs
// ---------------------------------------------------------------------------

/// Raw result of one call into an execution context.
///
/// A non-zero `error_code` is a hard failure; `output` may still carry the
/// engine's diagnostic text in that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutput {
    /// Text produced by the engine.
    pub output: String,
    /// Phase the engine reported for the task.
    pub phase: TaskPhase,
    /// Engine status code; `0` means success.
    pub error_code: i32,
}

impl TaskOutput {
    /// Creates a successful output.
    pub fn ok(output: impl Into<String>, phase: TaskPhase) -> Self {
        Self {
            output: output.into(),
            phase,
            error_code: 0,
        }
    }

    /// Returns `true` if the engine reported success.
    pub fn is_success(&self) -> bool {
        self.error_code == 0
    }
}

/// A task that completed locally without an engine error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    /// Local engine output.
    pub output: String,
    /// Phase reported by the engine.
    pub phase: TaskPhase,
}

// ---------------------------------------------------------------------------
// Locale
// ---------------------------------------------------------------------------

/// A primary language subtag (e.g. `"en"`, `"ru"`), always lowercase.
///
/// Region and script subtags are stripped on construction: `"en-US"` and
/// `"EN_gb"` both become `"en"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locale(String);

impl Locale {
    /// Locale used when a client expresses no language preference.
    pub const DEFAULT: &'static str = "en";

    /// Creates a locale from a language tag, keeping only its primary subtag.
    ///
    /// Returns `None` unless the primary subtag is 1 to 8 ASCII letters, so
    /// wildcards and anything carrying punctuation are refused.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next().unwrap_or_default();
        let valid = (1..=8).contains(&primary.len())
            && primary.bytes().all(|b| b.is_ascii_alphabetic());
        valid.then(|| Self(primary.to_ascii_lowercase()))
    }

    /// Returns the locale of the first tag in `tags`, or the default locale
    /// when that tag is unusable or `tags` is empty. Later tags are ignored.
    pub fn first_of<S: AsRef<str>>(tags: &[S]) -> Self {
        tags.first()
            .and_then(|tag| Self::from_tag(tag.as_ref()))
            .unwrap_or_default()
    }

    /// Returns the subtag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Discourse classification
// ---------------------------------------------------------------------------

/// Intent classification of a decoded utterance, as reported by the
/// linguistic service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscourseType {
    /// A statement: the user asserts something that is committed to the graph.
    Stm,
    /// A question about the graph.
    Query,
    /// A thematic utterance (topic change, small talk).
    Theme,
    /// Anything the service did not classify, or classified in a way the
    /// gateway does not act on.
    #[default]
    Unclassified,
}

impl DiscourseType {
    /// Parses the service's classification string; unknown values are
    /// [`DiscourseType::Unclassified`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "stm" => Self::Stm,
            "query" => Self::Query,
            "theme" => Self::Theme,
            _ => Self::Unclassified,
        }
    }

    /// Returns the classification as a string slice.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stm => "stm",
            Self::Query => "query",
            Self::Theme => "theme",
            Self::Unclassified => "unclassified",
        }
    }
}

impl std::fmt::Display for DiscourseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
