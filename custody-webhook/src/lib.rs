//! HTTP ingestion surface: a JWT-gated generic multipart upload endpoint
//! and a query-secret-gated crawler event endpoint, both handing verified
//! assets off to the attestation client the same way the file-ingest
//! pipeline (`custody-ingest`) does.
//!
//! This is the HTTP ingestion component of the content-integrity pipeline.

pub mod config;
pub mod error;
pub mod jwt;
pub mod routes;
pub mod server;
pub mod state;

pub use config::WebhookConfig;
pub use error::WebhookError;
pub use server::{build_router, init_tracing, run};
pub use state::{AppState, SharedState};
