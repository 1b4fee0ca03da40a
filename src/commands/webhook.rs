//! `custody webhook` — runs the webhook server using the shared config
//! and singletons.

use anyhow::Result;
use custody_keystore::KeyStore;
use custody_webhook::{AppState, WebhookConfig};

use crate::context::AppContext;

pub async fn run(ctx: &AppContext) -> Result<()> {
    let config = WebhookConfig {
        listen_addr: ctx.config.webhook.listen_addr.clone(),
        jwt_secret: ctx.config.webhook.jwt_secret.clone(),
        browsertrix_secret: ctx.config.webhook.browsertrix_secret.clone(),
        browsertrix_wacz_domains: ctx
            .config
            .wacz_domains
            .iter()
            .map(|k| custody_verify_wacz::AllowedKey {
                key: k.key.clone(),
                name: k.name.clone(),
            })
            .collect(),
    };
    let listen_addr = config.listen_addr.clone();

    let state = std::sync::Arc::new(AppState::new(
        config,
        ctx.ingest.attest.clone(),
        KeyStore::new(ctx.config.dirs.keys.clone()),
        ctx.config.dirs.files.clone(),
        ctx.config.dirs.temp.clone(),
    ));

    custody_webhook::init_tracing();
    custody_webhook::run(state, &listen_addr).await
}
