//! TOML configuration, loaded once at startup from a path given on the
//! command line or the `CUSTODY_CONFIG_PATH` environment variable, falling
//! back to a well-known system path. Field grouping mirrors
//! the on-disk layout.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "/etc/custody/config.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub aa: AttestConfig,
    #[serde(default)]
    pub webhook: WebhookSection,
    pub dirs: DirsConfig,
    #[serde(default)]
    pub bins: BinsConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub pgp_allowed_keys: Vec<NamedKey>,
    #[serde(default)]
    pub wacz_anon_keys: Vec<NamedKey>,
    #[serde(default)]
    pub wacz_domains: Vec<NamedKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttestConfig {
    pub url: String,
    #[serde(default)]
    pub jwt: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookSection {
    #[serde(default = "default_webhook_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default)]
    pub browsertrix_secret: Option<String>,
}

fn default_webhook_listen_addr() -> String {
    "0.0.0.0:8090".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirsConfig {
    pub files: PathBuf,
    pub keys: PathBuf,
    pub temp: PathBuf,
    pub c2pa_manifests: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BinsConfig {
    #[serde(default)]
    pub c2patool: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub sync_root: Option<PathBuf>,
}

/// One `{key, name}` allow-list entry; shape shared by PGP fingerprints,
/// base64 ECDSA public keys, and domain names.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedKey {
    pub key: String,
    pub name: String,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::var("CUSTODY_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file at {}", path.display()))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("failed to parse config file at {}", path.display()))?;
        Ok(config)
    }
}
