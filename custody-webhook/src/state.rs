use std::{path::PathBuf, sync::Arc};

use custody_attest_client::AttestClient;
use custody_keystore::KeyStore;
use custody_verify_wacz::AllowedKey;

use crate::config::WebhookConfig;

/// Shared state handed to every handler via axum's `State` extractor, per
/// the pack's own gateway-state shape
/// (`rishy2211-mlsnitch/api-gateway/src/state.rs`): one `Arc`, constructed
/// once, carrying the process-wide singletons.
pub struct AppState {
    pub http: reqwest::Client,
    pub attest: AttestClient,
    pub keystore: KeyStore,
    pub files_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub jwt_secret: Option<String>,
    pub browsertrix_secret: Option<String>,
    pub browsertrix_wacz_domains: Vec<AllowedKey>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        config: WebhookConfig,
        attest: AttestClient,
        keystore: KeyStore,
        files_dir: PathBuf,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            attest,
            keystore,
            files_dir,
            temp_dir,
            jwt_secret: config.jwt_secret,
            browsertrix_secret: config.browsertrix_secret,
            browsertrix_wacz_domains: config.browsertrix_wacz_domains,
        }
    }
}
