//! Script cache data model.
//!
//! The script cache file is loaded once at startup and is read-only afterwards.
//! It has two halves:
//!
//! - `scripts`: every [`Script`] with its named phases (rendered replies).
//! - `lang-caches`: every [`LangCache`], each holding conversation contexts
//!   ([`ScriptCtx`]) whose reactions ([`ScriptReact`]) list the literal trigger
//!   phrases that start them.
//!
//! ```json
//! {
//!   "scripts": [
//!     { "id": "sc-explore",
//!       "phases": { "init": { "body": { "en": "Start here." } } } }
//!   ],
//!   "lang-caches": [
//!     { "id": "en",
//!       "contexts": [
//!         { "id": "init",
//!           "reacts": [ { "id": "sc-explore", "triggers": ["Where do I start"] } ] }
//!       ] }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::CacheBuildError;
use crate::{ContextId, LangCacheId, Locale, ReactionId, ScriptId};

/// Name of the phase a cached reply is rendered from.
pub const INIT_PHASE: &str = "init";

// ---------------------------------------------------------------------------
// Localised text
// ---------------------------------------------------------------------------

/// Text keyed by locale subtag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    /// Returns the text for `locale`, falling back to the default locale.
    pub fn get(&self, locale: &Locale) -> Option<&str> {
        self.0
            .get(locale.as_str())
            .or_else(|| self.0.get(Locale::DEFAULT))
            .map(String::as_str)
    }

    /// Returns the text for `locale` (with fallback), or an empty string.
    pub fn render(&self, locale: &Locale) -> String {
        self.get(locale).unwrap_or_default().to_string()
    }

    /// Returns `true` if no locale has any text.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LocalizedText {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ---------------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------------

/// One selectable option offered at the end of a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    /// Option id sent back by the client when the option is chosen.
    pub id: String,
    /// Label shown to the user.
    #[serde(default)]
    pub title: LocalizedText,
}

/// One step of a script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScriptPhase {
    #[serde(default)]
    pub body: LocalizedText,
    /// Prompt that invites the user's next turn.
    #[serde(default)]
    pub quest: LocalizedText,
    #[serde(default)]
    pub menu: Vec<MenuOption>,
    /// Links to media or documents attached to the phase.
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub geo_tags: Vec<String>,
}

/// A scripted conversation: a set of named phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub id: ScriptId,
    #[serde(default)]
    pub phases: BTreeMap<String, ScriptPhase>,
}

impl Script {
    /// Returns the phase cached replies are rendered from.
    pub fn init_phase(&self) -> Option<&ScriptPhase> {
        self.phases.get(INIT_PHASE)
    }
}

// ---------------------------------------------------------------------------
// Conversation contexts and reactions
// ---------------------------------------------------------------------------

/// A reaction and the literal phrases that trigger it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptReact {
    pub id: ReactionId,
    #[serde(default)]
    pub triggers: Vec<String>,
}

/// A conversation context with its ordered reactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptCtx {
    pub id: ContextId,
    #[serde(default)]
    pub reacts: Vec<ScriptReact>,
}

/// All conversation contexts for one language family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangCache {
    pub id: LangCacheId,
    #[serde(default)]
    pub contexts: Vec<ScriptCtx>,
}

// ---------------------------------------------------------------------------
// Cache file
// ---------------------------------------------------------------------------

/// Parsed contents of the script cache file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheFile {
    #[serde(default)]
    pub scripts: Vec<Script>,
    #[serde(default)]
    pub lang_caches: Vec<LangCache>,
}

impl CacheFile {
    /// Parses the cache file's JSON text.
    pub fn from_json(text: &str) -> Result<Self, CacheBuildError> {
        Ok(serde_json::from_str(text)?)
    }
}
