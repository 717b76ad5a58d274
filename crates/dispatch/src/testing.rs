//! In-memory fakes of the port traits, shared by this crate's unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shard::{
    AuthorityClient, AuthorityError, CacheFile, Claims, Decoded, ExecutionError, LinguisticError,
    LinguisticService, Locale, TaskExecutor, TaskOutput, TaskPhase, TokenError, TokenSigner,
    TriggerCache,
};

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Executor that echoes its input or replays canned outputs.
pub struct ScriptedExecutor {
    replies: Option<VecDeque<TaskOutput>>,
    resets: Arc<AtomicUsize>,
}

impl ScriptedExecutor {
    /// Returns every task text as its own output with phase `get`.
    pub fn echo() -> Self {
        Self {
            replies: None,
            resets: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns `outputs` in order, one per call.
    pub fn replying(outputs: Vec<TaskOutput>) -> Self {
        Self {
            replies: Some(outputs.into()),
            resets: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of `reset` calls, readable after the executor moves into a pool.
    pub fn resets(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.resets)
    }
}

#[async_trait]
impl TaskExecutor for ScriptedExecutor {
    async fn execute(&mut self, task: &str) -> Result<TaskOutput, ExecutionError> {
        match &mut self.replies {
            None => Ok(TaskOutput::ok(task, TaskPhase::Get)),
            Some(replies) => replies.pop_front().ok_or_else(|| ExecutionError::Unavailable {
                message: "no scripted reply left".into(),
            }),
        }
    }

    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Authority
// ---------------------------------------------------------------------------

/// Authority that records every submission and gives a fixed answer.
pub struct RecordingAuthority {
    answer: Result<String, AuthorityError>,
    submitted: Mutex<Vec<String>>,
}

impl RecordingAuthority {
    pub fn answering(body: &str) -> Self {
        Self {
            answer: Ok(body.to_string()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: AuthorityError) -> Self {
        Self {
            answer: Err(error),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn submissions(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthorityClient for RecordingAuthority {
    async fn submit(&self, task: &str) -> Result<String, AuthorityError> {
        self.submitted.lock().unwrap().push(task.to_string());
        self.answer.clone()
    }
}

// ---------------------------------------------------------------------------
// Linguistic service
// ---------------------------------------------------------------------------

/// Linguistic service that classifies everything the same way.
///
/// Decoding wraps the text as `{graph TEXT}`; encoding prefixes the graph
/// with the locale, as in `ru: GRAPH`.
pub struct FakeLinguistic {
    discourse_type: Option<String>,
    decoded: Mutex<Vec<(String, String)>>,
}

impl FakeLinguistic {
    pub fn classifying(discourse_type: &str) -> Self {
        Self {
            discourse_type: Some(discourse_type.to_string()),
            decoded: Mutex::new(Vec::new()),
        }
    }

    /// Fails every decode with a 503.
    pub fn failing() -> Self {
        Self {
            discourse_type: None,
            decoded: Mutex::new(Vec::new()),
        }
    }

    /// `(text, locale)` of every decode call so far.
    pub fn decodes(&self) -> Vec<(String, String)> {
        self.decoded.lock().unwrap().clone()
    }
}

#[async_trait]
impl LinguisticService for FakeLinguistic {
    async fn decode(&self, text: &str, locale: &Locale) -> Result<Decoded, LinguisticError> {
        self.decoded
            .lock()
            .unwrap()
            .push((text.to_string(), locale.to_string()));
        let discourse_type = self.discourse_type.clone().ok_or(LinguisticError::Status {
            status: 503,
            body: "unavailable".into(),
        })?;
        Ok(Decoded {
            graph: format!("{{graph {text}}}"),
            discourse_type,
        })
    }

    async fn encode(&self, graph: &str, locale: &Locale) -> Result<String, LinguisticError> {
        Ok(format!("{locale}: {graph}"))
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Signer whose tokens are the claims' JSON text. `verify` accepts only
/// tokens it produced, and rejects expiry before `now`.
pub struct PlainSigner {
    pub now: i64,
    pub fail_signing: bool,
}

impl PlainSigner {
    pub fn new(now: i64) -> Self {
        Self {
            now,
            fail_signing: false,
        }
    }
}

impl TokenSigner for PlainSigner {
    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        if self.fail_signing {
            return Err(TokenError::Signing {
                message: "key unavailable".into(),
            });
        }
        let json = serde_json::to_string(claims).map_err(|err| TokenError::Signing {
            message: err.to_string(),
        })?;
        Ok(format!("plain.{json}"))
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let invalid = |message: &str| TokenError::Invalid {
            message: message.to_string(),
        };
        let json = token.strip_prefix("plain.").ok_or_else(|| invalid("bad prefix"))?;
        let claims: Claims = serde_json::from_str(json).map_err(|_| invalid("bad payload"))?;
        if claims.exp < self.now {
            return Err(invalid("expired"));
        }
        Ok(claims)
    }
}

// ---------------------------------------------------------------------------
// Script cache
// ---------------------------------------------------------------------------

/// Cache with `"Where do I start"` in context `init` pointing at `sc-explore`.
pub fn explore_cache() -> TriggerCache {
    let file = CacheFile::from_json(
        r#"{
            "scripts": [
                {
                    "id": "sc-explore",
                    "phases": {
                        "init": {
                            "body": { "en": "Open the map and pick a region.", "ru": "Откройте карту." },
                            "quest": { "en": "Which region first?" },
                            "menu": [ { "id": "north", "title": { "en": "North" } } ],
                            "resources": [ "/img/map.png" ]
                        }
                    }
                }
            ],
            "lang-caches": [
                {
                    "id": "en",
                    "contexts": [
                        { "id": "init", "reacts": [ { "id": "sc-explore", "triggers": [ "Where do I start" ] } ] }
                    ]
                }
            ]
        }"#,
    )
    .unwrap();
    TriggerCache::build(file).unwrap()
}
