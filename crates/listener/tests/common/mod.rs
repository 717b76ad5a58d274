//! Common test utilities: in-memory ports and a ready-made app.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use dispatch::{
    AdmissionConfig, CommitForwarder, MessageRouter, SessionIssuer, SessionPolicy, TaskDispatcher,
    WorkerPool,
};
use listener::{build_app, AppState, RouteAdmission};
use shard::{
    AuthorityClient, AuthorityError, CacheFile, Claims, Decoded, ExecutionError, LinguisticError,
    LinguisticService, Locale, ShardAccess, ShardInfo, ShardName, TaskExecutor, TaskOutput,
    TaskPhase, TokenError, TokenSigner, TriggerCache,
};

/// Echoes tasks back. `{task{!...` needs confirmation; `{broken` fails with
/// code 2.
pub struct EchoExecutor;

#[async_trait]
impl TaskExecutor for EchoExecutor {
    async fn execute(&mut self, task: &str) -> Result<TaskOutput, ExecutionError> {
        if task.contains("{broken") {
            return Ok(TaskOutput {
                output: "{err unbalanced}".into(),
                phase: TaskPhase::Other,
                error_code: 2,
            });
        }
        let phase = if task.starts_with("{task{!") {
            TaskPhase::NeedsConfirm
        } else {
            TaskPhase::Get
        };
        Ok(TaskOutput::ok(format!("{{\"echo\":{:?}}}", task), phase))
    }

    fn reset(&mut self) {}
}

/// Registers users as `U42` and accepts every other write. A task is
/// recorded in `submitted` once `delay` has passed.
#[derive(Default)]
pub struct StubAuthority {
    pub fail: bool,
    pub delay: Duration,
    pub submitted: Mutex<Vec<String>>,
}

#[async_trait]
impl AuthorityClient for StubAuthority {
    async fn submit(&self, task: &str) -> Result<String, AuthorityError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.submitted.lock().unwrap().push(task.to_string());
        if self.fail {
            return Err(AuthorityError::Unreachable {
                message: "connection refused".into(),
            });
        }
        if task.contains("{_auth") {
            Ok("{class User{!inst U42{_auth}}}".into())
        } else {
            Ok("{\"committed\":true}".into())
        }
    }
}

/// Classifies everything as a query, or fails when `fail` is set.
#[derive(Default)]
pub struct StubLinguistic {
    pub fail: bool,
    pub decodes: AtomicUsize,
}

#[async_trait]
impl LinguisticService for StubLinguistic {
    async fn decode(&self, text: &str, _locale: &Locale) -> Result<Decoded, LinguisticError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LinguisticError::Unreachable {
                message: "timed out".into(),
            });
        }
        Ok(Decoded {
            graph: format!("{{q {text}}}"),
            discourse_type: "query".into(),
        })
    }

    async fn encode(&self, graph: &str, _locale: &Locale) -> Result<String, LinguisticError> {
        Ok(graph.to_string())
    }
}

/// Tokens are `tok:<user id>`; `tok:` followed by nothing is invalid.
pub struct StubSigner;

impl TokenSigner for StubSigner {
    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        Ok(format!("tok:{}", claims.user_id))
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        match token.strip_prefix("tok:") {
            Some(user) if !user.is_empty() => Ok(Claims {
                exp: i64::MAX,
                user_id: user.to_string(),
                shard_id: "lobby".into(),
                roles: vec!["user".into()],
            }),
            _ => Err(TokenError::Invalid {
                message: "unknown token".into(),
            }),
        }
    }
}

pub const CACHE: &str = r#"{
    "scripts": [
        { "id": "sc-explore", "phases": { "init": {
            "body": { "en": "Open the map and pick a region." },
            "quest": { "en": "Which region first?" }
        } } }
    ],
    "lang-caches": [
        { "id": "en", "contexts": [
            { "id": "init", "reacts": [ { "id": "sc-explore", "triggers": [ "Where do I start" ] } ] }
        ] }
    ]
}"#;

pub struct TestGateway {
    pub authority: Arc<StubAuthority>,
    pub linguistic: Arc<StubLinguistic>,
    pub app: Router,
}

pub struct Options {
    pub authority_fails: bool,
    pub authority_delay: Duration,
    pub decoder_fails: bool,
    pub admission: AdmissionConfig,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            authority_fails: false,
            authority_delay: Duration::ZERO,
            decoder_fails: false,
            admission: AdmissionConfig {
                capacity: 4,
                wait: Duration::from_millis(50),
            },
        }
    }
}

pub fn test_gateway(options: Options) -> TestGateway {
    let authority = Arc::new(StubAuthority {
        fail: options.authority_fails,
        delay: options.authority_delay,
        ..StubAuthority::default()
    });
    let linguistic = Arc::new(StubLinguistic {
        fail: options.decoder_fails,
        ..StubLinguistic::default()
    });
    let forwarder = CommitForwarder::new(authority.clone());
    let executors: Vec<Box<dyn TaskExecutor>> = vec![Box::new(EchoExecutor), Box::new(EchoExecutor)];
    let cache = TriggerCache::build(CacheFile::from_json(CACHE).unwrap()).unwrap();

    let state = AppState {
        dispatcher: TaskDispatcher::new(WorkerPool::new(executors).unwrap(), forwarder.clone()),
        router: MessageRouter::new(Arc::new(cache), linguistic.clone(), forwarder.clone()),
        issuer: SessionIssuer::new(
            vec![ShardInfo {
                name: ShardName::new("lobby").unwrap(),
                access: ShardAccess::Public,
                max_users: 0,
                max_sessions: 0,
            }],
            forwarder,
            Arc::new(StubSigner),
            SessionPolicy {
                service_domain: "aide.example.org".into(),
                ..SessionPolicy::default()
            },
        ),
        admission: RouteAdmission::uniform(options.admission),
    };

    TestGateway {
        authority,
        linguistic,
        app: build_app(state),
    }
}
