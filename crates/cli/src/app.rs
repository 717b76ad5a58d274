//! Component construction: turns a [`GatewayConfig`] into a ready [`AppState`].

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use authority::HttpAuthorityClient;
use dispatch::{CommitForwarder, MessageRouter, SessionIssuer, TaskDispatcher, WorkerPool};
use engine::EngineClient;
use linguistic::HttpLinguisticService;
use listener::{AppState, RouteAdmission};
use shard::{CacheFile, TokenSigner, TriggerCache};
use tokens::JwtSigner;
use tracing::info;

use crate::config::{GatewayConfig, KeySource};

/// Builds every component. Any failure here is fatal to startup.
pub fn build_state(config: &GatewayConfig) -> anyhow::Result<AppState> {
    let cache = load_trigger_cache(&config.cache_path)?;

    let concurrency = config.concurrency();
    let engine = EngineClient::new(&config.engine_address)?;
    let pool = WorkerPool::new(engine.executors(concurrency)).context("building worker pool")?;

    let authority = HttpAuthorityClient::new(&config.authority_address)?;
    let forwarder = CommitForwarder::new(Arc::new(authority));
    let linguistic = HttpLinguisticService::new(&config.ling_address)?;

    let issuer = SessionIssuer::new(
        config.peers.clone(),
        forwarder.clone(),
        load_signer(&config.key_source()?)?,
        config.session_policy(),
    );

    info!(
        workers = concurrency,
        engine = %config.engine_address,
        authority = %config.authority_address,
        ling = %config.ling_address,
        "Components ready"
    );
    Ok(AppState {
        dispatcher: TaskDispatcher::new(pool, forwarder.clone()),
        router: MessageRouter::new(Arc::new(cache), Arc::new(linguistic), forwarder),
        issuer,
        admission: RouteAdmission::uniform(config.admission()),
    })
}

fn load_trigger_cache(path: &Path) -> anyhow::Result<TriggerCache> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading script cache {}", path.display()))?;
    let file = CacheFile::from_json(&text)
        .with_context(|| format!("parsing script cache {}", path.display()))?;
    let cache = TriggerCache::build(file)
        .with_context(|| format!("indexing script cache {}", path.display()))?;
    info!(
        phrases = cache.phrase_count(),
        scripts = cache.script_count(),
        "Trigger cache loaded"
    );
    Ok(cache)
}

fn load_signer(source: &KeySource) -> anyhow::Result<Arc<dyn TokenSigner>> {
    let signer = match source {
        KeySource::Rsa { sign, verify } => {
            let sign_pem = std::fs::read(sign)
                .with_context(|| format!("reading signing key {}", sign.display()))?;
            let verify_pem = std::fs::read(verify)
                .with_context(|| format!("reading verification key {}", verify.display()))?;
            JwtSigner::from_rsa_pem(&sign_pem, &verify_pem)?
        }
        KeySource::Secret(secret) => JwtSigner::from_secret(secret.as_bytes()),
    };
    info!(algorithm = ?signer.algorithm(), "Session token signer ready");
    Ok(Arc::new(signer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CACHE: &str = r#"{
        "scripts": [ { "id": "sc-explore", "phases": { "init": { "body": { "en": "Start here." } } } } ],
        "lang-caches": [ { "id": "en", "contexts": [
            { "id": "init", "reacts": [ { "id": "sc-explore", "triggers": [ "Where do I start" ] } ] }
        ] } ]
    }"#;

    fn write_temp(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    fn config(cache_path: &Path) -> GatewayConfig {
        let mut config = GatewayConfig::from_json(
            r#"{
                "authority-address": "http://authority:8090",
                "engine-address": "http://engine:8081",
                "ling-address": "http://ling:8082",
                "cache-path": "/unused",
                "peers": [ { "name": "lobby", "access": "public" } ],
                "token-secret": "dev",
                "concurrency": 3
            }"#,
        )
        .unwrap();
        config.cache_path = cache_path.to_path_buf();
        config
    }

    #[test]
    fn state_is_built_from_valid_config() {
        let cache = write_temp(CACHE);

        let state = build_state(&config(cache.path())).unwrap();

        assert_eq!(state.dispatcher.pool().size(), 3);
        assert_eq!(state.admission.query.config().capacity, 10);
    }

    #[test]
    fn missing_cache_file_is_fatal() {
        let err = build_state(&config(Path::new("/nonexistent/cache.json"))).unwrap_err();
        assert!(format!("{err:#}").contains("reading script cache"));
    }

    #[test]
    fn corrupt_cache_file_is_fatal() {
        let cache = write_temp("{ \"scripts\": [");
        let err = build_state(&config(cache.path())).unwrap_err();
        assert!(format!("{err:#}").contains("parsing script cache"));
    }

    #[test]
    fn dangling_reaction_is_fatal() {
        let cache = write_temp(&CACHE.replace("\"id\": \"sc-explore\", \"phases\"", "\"id\": \"sc-other\", \"phases\""));
        let err = build_state(&config(cache.path())).unwrap_err();
        assert!(format!("{err:#}").contains("indexing script cache"));
    }

    #[test]
    fn missing_key_file_is_fatal() {
        let source = KeySource::Rsa {
            sign: "/nonexistent/sign.pem".into(),
            verify: "/nonexistent/verify.pem".into(),
        };
        assert!(load_signer(&source).is_err());
    }
}
