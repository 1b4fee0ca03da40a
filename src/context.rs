//! Process-wide singletons: the HTTP-backed attestation client, the
//! Postgres pool, and the local directories the core reads and writes
//! under. Built once in `main` and handed down by reference.

use std::sync::Arc;

use anyhow::{Context, Result};
use custody_attest_client::AttestClient;
use custody_ingest::IngestContext;
use custody_keystore::KeyStore;
use custody_verify_wacz::AllowedKey as WaczAllowedKey;

use crate::config::Config;

pub struct AppContext {
    pub config: Config,
    pub ingest: Arc<IngestContext>,
}

impl AppContext {
    pub async fn build(config: Config) -> Result<Self> {
        let pool = custody_ingest::db::connect(&config.database.url)
            .await
            .context("failed to connect to the configured database")?;

        let attest = AttestClient::new(config.aa.url.clone(), config.aa.jwt.clone())
            .context("failed to build the attestation client")?;

        let keystore = KeyStore::new(config.dirs.keys.clone());

        let to_wacz_keys = |keys: &[crate::config::NamedKey]| -> Vec<WaczAllowedKey> {
            keys.iter()
                .map(|k| WaczAllowedKey {
                    key: k.key.clone(),
                    name: k.name.clone(),
                })
                .collect()
        };

        let ingest = Arc::new(IngestContext {
            pool,
            keystore,
            attest,
            files_dir: config.dirs.files.clone(),
            temp_dir: config.dirs.temp.clone(),
            pgp_allowed_fingerprints: config.pgp_allowed_keys.iter().map(|k| k.key.clone()).collect(),
            wacz_anon_keys: to_wacz_keys(&config.wacz_anon_keys),
            wacz_domains: to_wacz_keys(&config.wacz_domains),
        });

        Ok(Self { config, ingest })
    }

    pub fn attest(&self) -> &AttestClient {
        &self.ingest.attest
    }

    pub fn keystore(&self) -> &KeyStore {
        &self.ingest.keystore
    }

    pub fn derive_context(&self) -> Result<custody_derive::DeriveContext> {
        let c2pa_tool_path = self
            .config
            .bins
            .c2patool
            .clone()
            .context("bins.c2patool is not set in the config")?;

        Ok(custody_derive::DeriveContext {
            attest: clone_attest_client(&self.ingest.attest),
            keystore: KeyStore::new(self.config.dirs.keys.clone()),
            files_dir: self.config.dirs.files.clone(),
            temp_dir: self.config.dirs.temp.clone(),
            template_dir: self.config.dirs.c2pa_manifests.clone(),
            c2pa_tool_path,
        })
    }
}

/// `AttestClient` is `Clone` (it wraps a shared `reqwest::Client`); this
/// just gives the derive-flow its own owned handle without threading
/// lifetimes through `DeriveContext`.
fn clone_attest_client(client: &AttestClient) -> AttestClient {
    client.clone()
}
