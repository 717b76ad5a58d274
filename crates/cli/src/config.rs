//! Gateway configuration: a JSON file plus command-line overrides.
//!
//! The parsed [`GatewayConfig`] is immutable after startup. Components never
//! see it directly; they receive the narrower configs built from it
//! ([`AdmissionConfig`], [`SessionPolicy`], [`KeySource`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::TimeDelta;
use clap::{Parser, ValueEnum};
use dispatch::{AdmissionConfig, SessionPolicy};
use serde::Deserialize;
use shard::{select_public_shard, ShardInfo};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Text,
}

/// Aide request gateway.
#[derive(Debug, Parser)]
#[command(name = "aide", version, about)]
pub struct Args {
    /// Path to the JSON configuration file.
    #[arg(long, default_value = "/etc/aide/aide.json")]
    pub config_path: PathBuf,

    /// Address to listen on, e.g. `0.0.0.0:8080`.
    #[arg(long)]
    pub listen_address: Option<String>,

    /// Base URL of the linguistic service.
    #[arg(long)]
    pub ling_address: Option<String>,

    /// Path to the script cache file.
    #[arg(long)]
    pub cache_path: Option<PathBuf>,

    /// Concurrent requests admitted per route.
    #[arg(long)]
    pub requests_limit: Option<usize>,

    /// How long a request may wait for an admission slot, in milliseconds.
    #[arg(long)]
    pub request_limit_duration_ms: Option<u64>,

    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_service_domain() -> String {
    "localhost".to_string()
}

fn default_requests_max() -> usize {
    10
}

fn default_slot_await_ms() -> u64 {
    1000
}

fn default_token_expiry_hours() -> i64 {
    24
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

fn default_roles() -> Vec<String> {
    vec!["user".to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_service_domain")]
    pub service_domain: String,
    pub authority_address: String,
    pub engine_address: String,
    pub ling_address: String,
    pub cache_path: PathBuf,
    #[serde(default)]
    pub peers: Vec<ShardInfo>,
    #[serde(default = "default_requests_max")]
    pub requests_max: usize,
    #[serde(default = "default_slot_await_ms")]
    pub slot_await_ms: u64,
    /// Number of execution contexts; defaults to available parallelism.
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub sign_key_path: Option<PathBuf>,
    #[serde(default)]
    pub verify_key_path: Option<PathBuf>,
    /// Shared HS256 secret for development setups without key files.
    #[serde(default)]
    pub token_secret: Option<String>,
    #[serde(default = "default_token_expiry_hours")]
    pub token_expiry_hours: i64,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_roles")]
    pub roles: Vec<String>,
}

/// Where session tokens get their keys from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Rsa { sign: PathBuf, verify: PathBuf },
    Secret(String),
}

impl GatewayConfig {
    /// Reads, parses and validates the file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns this config with command-line flags applied on top.
    pub fn with_overrides(mut self, args: &Args) -> anyhow::Result<Self> {
        if let Some(address) = &args.listen_address {
            self.listen_address.clone_from(address);
        }
        if let Some(address) = &args.ling_address {
            self.ling_address.clone_from(address);
        }
        if let Some(path) = &args.cache_path {
            self.cache_path.clone_from(path);
        }
        if let Some(limit) = args.requests_limit {
            self.requests_max = limit;
        }
        if let Some(ms) = args.request_limit_duration_ms {
            self.slot_await_ms = ms;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.requests_max == 0 {
            bail!("requests-max must be at least 1");
        }
        if self.concurrency == Some(0) {
            bail!("concurrency must be at least 1");
        }
        if self.token_expiry_hours <= 0 || TimeDelta::try_hours(self.token_expiry_hours).is_none() {
            bail!("token-expiry-hours must be positive and within range");
        }
        if select_public_shard(&self.peers).is_none() {
            bail!("no public shard available among {} configured peers", self.peers.len());
        }
        self.key_source().map(|_| ())
    }

    pub fn admission(&self) -> AdmissionConfig {
        AdmissionConfig {
            capacity: self.requests_max,
            wait: Duration::from_millis(self.slot_await_ms),
        }
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            // Range checked in `validate`.
            token_expiry: TimeDelta::try_hours(self.token_expiry_hours).unwrap_or(TimeDelta::MAX),
            service_domain: self.service_domain.clone(),
            roles: self.roles.clone(),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(1)
        })
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// RSA key files win over a shared secret.
    pub fn key_source(&self) -> anyhow::Result<KeySource> {
        match (&self.sign_key_path, &self.verify_key_path, &self.token_secret) {
            (Some(sign), Some(verify), _) => Ok(KeySource::Rsa {
                sign: sign.clone(),
                verify: verify.clone(),
            }),
            (Some(_), None, _) | (None, Some(_), _) => {
                bail!("sign-key-path and verify-key-path must be set together")
            }
            (None, None, Some(secret)) if !secret.is_empty() => Ok(KeySource::Secret(secret.clone())),
            (None, None, _) => bail!("no token keys: set sign-key-path and verify-key-path, or token-secret"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "authority-address": "http://authority:8090",
        "engine-address": "http://engine:8081",
        "ling-address": "http://ling:8082",
        "cache-path": "/var/lib/aide/cache.json",
        "peers": [ { "name": "lobby", "access": "public" } ],
        "token-secret": "dev"
    }"#;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["aide"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn defaults_fill_unset_fields() {
        let config = GatewayConfig::from_json(MINIMAL).unwrap();

        assert_eq!(config.listen_address, "0.0.0.0:8080");
        assert_eq!(
            config.admission(),
            AdmissionConfig {
                capacity: 10,
                wait: Duration::from_millis(1000)
            }
        );
        assert_eq!(config.session_policy().token_expiry, TimeDelta::hours(24));
        assert_eq!(config.shutdown_grace(), Duration::from_secs(30));
        assert_eq!(config.roles, vec!["user".to_string()]);
        assert!(config.concurrency() >= 1);
        assert_eq!(config.key_source().unwrap(), KeySource::Secret("dev".into()));
    }

    #[test]
    fn flags_override_the_file() {
        let config = GatewayConfig::from_json(MINIMAL)
            .unwrap()
            .with_overrides(&args(&[
                "--listen-address",
                "127.0.0.1:9000",
                "--requests-limit",
                "3",
                "--request-limit-duration-ms",
                "250",
                "--cache-path",
                "/tmp/cache.json",
            ]))
            .unwrap();

        assert_eq!(config.listen_address, "127.0.0.1:9000");
        assert_eq!(config.admission().capacity, 3);
        assert_eq!(config.admission().wait, Duration::from_millis(250));
        assert_eq!(config.cache_path, PathBuf::from("/tmp/cache.json"));
    }

    #[test]
    fn default_flags_change_nothing() {
        let parsed = args(&[]);
        assert_eq!(parsed.config_path, PathBuf::from("/etc/aide/aide.json"));
        assert_eq!(parsed.log_format, LogFormat::Json);

        let config = GatewayConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.clone().with_overrides(&parsed).unwrap(), config);
    }

    #[test]
    fn config_without_public_peer_is_rejected() {
        let text = MINIMAL.replace("\"public\"", "\"private\"");
        let err = GatewayConfig::from_json(&text).unwrap_err();
        assert!(err.to_string().contains("no public shard"));
    }

    #[test]
    fn out_of_range_token_expiry_is_rejected() {
        for hours in ["0", "-1", "9223372036854775807"] {
            let text = MINIMAL.replace(
                "\"token-secret\"",
                &format!("\"token-expiry-hours\": {hours}, \"token-secret\""),
            );
            let err = GatewayConfig::from_json(&text).unwrap_err();
            assert!(err.to_string().contains("token-expiry-hours"), "{hours}: {err}");
        }
    }

    #[test]
    fn key_files_must_come_in_pairs() {
        let text = MINIMAL.replace(
            "\"token-secret\": \"dev\"",
            "\"sign-key-path\": \"/etc/aide/sign.pem\"",
        );
        assert!(GatewayConfig::from_json(&text).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let text = MINIMAL.replace("\"token-secret\"", "\"tokn-secret\"");
        assert!(GatewayConfig::from_json(&text).is_err());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = GatewayConfig::load(file.path()).unwrap();

        assert_eq!(config.engine_address, "http://engine:8081");
        assert_eq!(config.peers[0].name.as_str(), "lobby");
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = GatewayConfig::load(Path::new("/nonexistent/aide.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/aide.json"));
    }
}
