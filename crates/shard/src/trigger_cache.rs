//! Trigger index used to answer recurring chat messages without decoding them.
//!
//! [`TriggerCache::build`] walks every language cache, context, reaction and
//! trigger phrase exactly once at startup and files each phrase under its
//! uppercased form. The result is immutable, so [`TriggerCache::lookup`] is
//! safe for any number of concurrent readers without locking.
//!
//! ## Matching rules
//!
//! - Phrases are uppercased at registration; messages are trimmed and
//!   uppercased at lookup.
//! - A bucket keeps registration order. Lookup returns the first entry whose
//!   context equals the requested context.
//! - A phrase registered only under another context is a miss.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::CacheBuildError;
use crate::script::{CacheFile, Script};
use crate::{ContextId, Locale, ReactionId, ScriptId};

/// One `(context, reaction)` registration of a trigger phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEntry {
    pub context: ContextId,
    pub reaction: ReactionId,
}

/// A menu option rendered for one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub title: String,
}

/// Reply built from the `init` phase of a cached script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheReply {
    /// Script the reply was rendered from.
    pub script: ScriptId,
    pub body: String,
    pub quest: String,
    pub menu: Vec<MenuItem>,
    pub resources: Vec<String>,
    pub geo_tags: Vec<String>,
}

/// Immutable index from normalised trigger phrase to its registrations.
#[derive(Debug, Default)]
pub struct TriggerCache {
    buckets: HashMap<String, Vec<TriggerEntry>>,
    scripts: HashMap<ScriptId, Script>,
}

impl TriggerCache {
    /// Builds the index from a parsed cache file.
    ///
    /// Fails if two scripts share an id, or if any reaction resolves to a
    /// script that is missing or has no `init` phase: every hit must be
    /// answerable.
    pub fn build(file: CacheFile) -> Result<Self, CacheBuildError> {
        let mut scripts = HashMap::with_capacity(file.scripts.len());
        for script in file.scripts {
            if scripts.contains_key(&script.id) {
                return Err(CacheBuildError::DuplicateScript { script: script.id });
            }
            scripts.insert(script.id.clone(), script);
        }

        let mut buckets: HashMap<String, Vec<TriggerEntry>> = HashMap::new();
        for lang_cache in &file.lang_caches {
            for ctx in &lang_cache.contexts {
                for react in &ctx.reacts {
                    let script = scripts.get(&react.id.script_id()).ok_or_else(|| {
                        CacheBuildError::UnknownScript {
                            context: ctx.id.clone(),
                            reaction: react.id.clone(),
                        }
                    })?;
                    if script.init_phase().is_none() {
                        return Err(CacheBuildError::MissingInitPhase {
                            script: script.id.clone(),
                        });
                    }
                    for trigger in &react.triggers {
                        buckets
                            .entry(normalize_trigger(trigger))
                            .or_default()
                            .push(TriggerEntry {
                                context: ctx.id.clone(),
                                reaction: react.id.clone(),
                            });
                    }
                }
            }
            debug!(lang_cache = %lang_cache.id, contexts = lang_cache.contexts.len(), "Indexed language cache");
        }

        Ok(Self { buckets, scripts })
    }

    /// Returns the first registration of `raw_message` under `context`.
    pub fn find(&self, context: &ContextId, raw_message: &str) -> Option<&TriggerEntry> {
        self.buckets
            .get(&normalize_message(raw_message))?
            .iter()
            .find(|entry| &entry.context == context)
    }

    /// Resolves `raw_message` in `context` to a reply rendered for `locale`.
    ///
    /// Returns `None` on a miss, including when the phrase is only registered
    /// under a different context.
    pub fn lookup(
        &self,
        context: &ContextId,
        raw_message: &str,
        locale: &Locale,
    ) -> Option<CacheReply> {
        let entry = self.find(context, raw_message)?;
        let script = self.scripts.get(&entry.reaction.script_id())?;
        let phase = script.init_phase()?;

        Some(CacheReply {
            script: script.id.clone(),
            body: phase.body.render(locale),
            quest: phase.quest.render(locale),
            menu: phase
                .menu
                .iter()
                .map(|option| MenuItem {
                    id: option.id.clone(),
                    title: option.title.render(locale),
                })
                .collect(),
            resources: phase.resources.clone(),
            geo_tags: phase.geo_tags.clone(),
        })
    }

    /// Number of distinct normalised trigger phrases.
    pub fn phrase_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of scripts available to cached replies.
    pub fn script_count(&self) -> usize {
        self.scripts.len()
    }
}

/// Normalises a trigger phrase for registration.
fn normalize_trigger(phrase: &str) -> String {
    phrase.to_uppercase()
}

/// Normalises an incoming message for lookup.
fn normalize_message(message: &str) -> String {
    message.trim().to_uppercase()
}
