use thiserror::Error;

/// Failures from the two derived-artifact flows.
#[derive(Debug, Error)]
pub enum DeriveError {
    #[error("source CID {0} has no file in the files directory")]
    SourceNotFound(String),
    #[error("manifest template {0} not found")]
    TemplateNotFound(String),
    #[error("{0} exited with status {1}")]
    ToolFailed(String, i32),
    #[error("external tool could not be launched: {0}")]
    ToolUnavailable(String),
    #[error("attestation service error: {0}")]
    Attest(String),
    #[error("io error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for DeriveError {
    fn from(e: std::io::Error) -> Self {
        DeriveError::IOError(e.to_string())
    }
}

impl From<anyhow::Error> for DeriveError {
    fn from(e: anyhow::Error) -> Self {
        DeriveError::IOError(e.to_string())
    }
}

impl From<custody_attest_client::AttestError> for DeriveError {
    fn from(e: custody_attest_client::AttestError) -> Self {
        DeriveError::Attest(e.to_string())
    }
}
