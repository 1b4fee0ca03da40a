use custody_attest_client::AttestError;
use thiserror::Error;

/// The error taxonomy the ingest pipeline surfaces to its callers. Every
/// variant is also representable as an `anyhow::Error` at the call site
/// (the CLI, webhook, and watcher binaries all propagate through
/// `anyhow`), but code inside this crate matches on `IngestError` directly
/// to decide retry/no-retry behavior.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The attestation for this attribute is encrypted and no key was supplied.
    #[error("attestation attribute is encrypted and no key was supplied")]
    NeedsKey,
    /// A (CID, attribute) pair or referenced resource is absent.
    #[error("not found: {0}")]
    NotFound(String),
    /// Hash mismatch, signature mismatch, untrusted certificate, key not in
    /// the allow-list, or a tampered bundle. Fatal and never retried.
    #[error("verification failed: {0}")]
    VerificationFailed(String),
    /// A non-200 response from the attestation service other than 400/404,
    /// or a network-level failure reaching it.
    #[error("attestation service transport error ({status}): {body}")]
    TransportError { status: u16, body: String },
    /// Missing binary, missing configured directory, or missing credentials.
    #[error("configuration error: {0}")]
    ConfigError(String),
    /// Local filesystem or database error.
    #[error("io error: {0}")]
    IOError(String),
}

impl From<AttestError> for IngestError {
    fn from(e: AttestError) -> Self {
        match e {
            AttestError::NeedsKey => IngestError::NeedsKey,
            AttestError::NotFound => IngestError::NotFound("attestation resource".to_string()),
            AttestError::TransportError { status, body } => IngestError::TransportError { status, body },
            AttestError::Reqwest(err) => IngestError::TransportError { status: 0, body: err.to_string() },
            AttestError::Encode(msg) | AttestError::Decode(msg) => {
                IngestError::TransportError { status: 0, body: msg }
            }
        }
    }
}

impl From<std::io::Error> for IngestError {
    fn from(e: std::io::Error) -> Self {
        IngestError::IOError(e.to_string())
    }
}

impl From<sqlx::Error> for IngestError {
    fn from(e: sqlx::Error) -> Self {
        IngestError::IOError(e.to_string())
    }
}

impl From<anyhow::Error> for IngestError {
    fn from(e: anyhow::Error) -> Self {
        IngestError::IOError(e.to_string())
    }
}
