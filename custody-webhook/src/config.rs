use custody_verify_wacz::AllowedKey;

/// Runtime configuration for the webhook server, assembled by the root
/// crate's config loader from the shared TOML file and handed to
/// [`crate::state::AppState::new`].
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Address to bind, e.g. `0.0.0.0:8088`.
    pub listen_addr: String,
    /// HMAC secret gating `/generic`. An empty/absent secret disables auth
    /// entirely rather than rejecting every request.
    pub jwt_secret: Option<String>,
    /// Query-string secret gating `/browsertrix`.
    pub browsertrix_secret: Option<String>,
    /// Certified-domain allow-list trusted for crawler WACZ signatures.
    pub browsertrix_wacz_domains: Vec<AllowedKey>,
}
