use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;

use crate::{
    jwt::require_jwt,
    routes::{browsertrix::handle_browsertrix, generic::handle_generic, ping::handle_ping},
    state::SharedState,
};

/// Builds the router, matching the pack's own gateway shape
/// (`rishy2211-mlsnitch/api-gateway/src/main.rs`): plain routes, one
/// `with_state`, a `route_layer` gating only the routes that need it.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/generic", post(handle_generic).route_layer(middleware::from_fn_with_state(state.clone(), require_jwt)))
        .route("/browsertrix", post(handle_browsertrix))
        .route("/ping", get(handle_ping))
        .with_state(state)
}

/// Initializes `tracing-subscriber` the way every axum binary in this
/// workspace does, honoring `RUST_LOG` with a sane default.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "custody_webhook=info".to_string()))
        .init();
}

/// Runs the webhook server until `ctrl_c`: in-flight requests finish, no
/// new connections are accepted.
pub async fn run(state: SharedState, listen_addr: &str) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!("webhook server listening on {listen_addr}");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
