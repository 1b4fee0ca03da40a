//! Typed HTTP client for the external attestation service.
//!
//! All request/response bodies are DAG-CBOR (`custody-codec`); this crate
//! only owns the endpoint shapes and status-code-to-error mapping, never
//! the service itself.

use std::time::Duration;

use anyhow::Result;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client, StatusCode,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Wire content type for every request/response body per the codec's
/// deterministic DAG-CBOR encoding rules.
const CBOR_CONTENT_TYPE: &str = "application/cbor";

/// Errors this client maps status codes and transport failures onto. See
/// the error kinds named in the core error-handling design: these are the
/// client-side half (`NeedsKey`, `NotFound`, `TransportError`).
#[derive(Debug, Error)]
pub enum AttestError {
    #[error("attribute is encrypted and no key was supplied")]
    NeedsKey,
    #[error("resource not found")]
    NotFound,
    #[error("attestation service returned {status}: {body}")]
    TransportError { status: u16, body: String },
    #[error("transport error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed to encode request body as dag-cbor: {0}")]
    Encode(String),
    #[error("failed to decode response body as dag-cbor: {0}")]
    Decode(String),
}

/// One attribute tuple as sent to `POST /v1/c/{cid}?index=1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeTuple {
    pub key: String,
    pub value: serde_json::Value,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enc_key: Option<String>,
}

/// Relationship side: which direction the edge is recorded from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RelationSide {
    Children,
    Parents,
}

/// Body for `POST /v1/rel/{cid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub side: RelationSide,
    pub relation_type: String,
    pub cid: String,
}

/// Query options for `GET /v1/c/{cid}/{attr}`.
#[derive(Debug, Clone, Default)]
pub struct AttributeOptions {
    pub enc_key: Option<String>,
    pub leave_encrypted: bool,
    pub format: Option<String>,
}

/// A typed handle to the attestation service, sharing one `reqwest::Client`
/// per the process-wide-singleton design in the core.
#[derive(Clone)]
pub struct AttestClient {
    http: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl AttestClient {
    pub fn new(base_url: impl Into<String>, bearer_token: Option<String>) -> Result<Self> {
        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            bearer_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Builds a `POST` with a pre-encoded DAG-CBOR body and the matching
    /// `Content-Type` — every request body this client sends is DAG-CBOR.
    fn cbor_post(&self, path: &str, body: Vec<u8>) -> reqwest::RequestBuilder {
        self.http
            .post(self.url(path))
            .header(CONTENT_TYPE, CBOR_CONTENT_TYPE)
            .header(ACCEPT, CBOR_CONTENT_TYPE)
            .body(body)
    }

    fn map_status(status: StatusCode, body: String) -> AttestError {
        match status {
            StatusCode::BAD_REQUEST => AttestError::NeedsKey,
            StatusCode::NOT_FOUND => AttestError::NotFound,
            _ => AttestError::TransportError {
                status: status.as_u16(),
                body,
            },
        }
    }

    /// `GET /v1/c/{cid}/{attr}?key=…&decrypt=0/1&format=…`
    pub async fn get_attribute_raw(
        &self,
        cid: &str,
        attr: &str,
        opts: &AttributeOptions,
    ) -> Result<Vec<u8>, AttestError> {
        let mut req = self.http.get(self.url(&format!("/v1/c/{cid}/{attr}")));

        let decrypt = if opts.leave_encrypted { "0" } else { "1" };
        req = req.query(&[("decrypt", decrypt)]);

        if let Some(key) = &opts.enc_key {
            // `enc_key` is the hex encoding used everywhere else in this
            // workspace for key material (see `custody-ingest`'s hoist
            // rule); re-encode as base64url for the wire, per the
            // endpoint's `key=` query parameter contract.
            let raw = hex::decode(key).map_err(|e| AttestError::Encode(format!("enc_key is not hex: {e}")))?;
            let encoded = URL_SAFE_NO_PAD.encode(raw);
            req = req.query(&[("key", encoded)]);
        }
        if let Some(format) = &opts.format {
            req = req.query(&[("format", format)]);
        }

        let resp = req.send().await?;
        let status = resp.status();

        if status.is_success() {
            Ok(resp.bytes().await?.to_vec())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(Self::map_status(status, body))
        }
    }

    /// `GET /v1/c/{cid}` — the full attribute map, DAG-CBOR-encoded.
    pub async fn get_all_attributes(&self, cid: &str) -> Result<Vec<u8>, AttestError> {
        let resp = self.http.get(self.url(&format!("/v1/c/{cid}"))).send().await?;
        let status = resp.status();

        if status.is_success() {
            Ok(resp.bytes().await?.to_vec())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(Self::map_status(status, body))
        }
    }

    /// `POST /v1/c/{cid}?index=1`
    pub async fn set_attestations(
        &self,
        cid: &str,
        attributes: &[AttributeTuple],
        index: bool,
    ) -> Result<(), AttestError> {
        let body = custody_codec::to_vec(attributes).map_err(|e| AttestError::Encode(e.to_string()))?;
        let mut req = self.cbor_post(&format!("/v1/c/{cid}"), body);

        if index {
            req = req.query(&[("index", "1")]);
        }
        req = self.authorize(req);

        let resp = req.send().await?;
        let status = resp.status();

        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(Self::map_status(status, body))
        }
    }

    /// `POST /v1/c/{cid}/{attr}?append=1`
    pub async fn append_attribute(
        &self,
        cid: &str,
        attr: &str,
        value: &serde_json::Value,
        enc_key: Option<&str>,
    ) -> Result<(), AttestError> {
        #[derive(Serialize)]
        struct AppendBody<'a> {
            value: &'a serde_json::Value,
            #[serde(rename = "encKey", skip_serializing_if = "Option::is_none")]
            enc_key: Option<&'a str>,
        }

        let body = custody_codec::to_vec(&AppendBody { value, enc_key })
            .map_err(|e| AttestError::Encode(e.to_string()))?;

        let req = self
            .cbor_post(&format!("/v1/c/{cid}/{attr}"), body)
            .query(&[("append", "1")]);
        let req = self.authorize(req);

        let resp = req.send().await?;
        let status = resp.status();

        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(Self::map_status(status, body))
        }
    }

    /// `POST /v1/rel/{cid}`
    pub async fn add_relationship(&self, cid: &str, relationship: &Relationship) -> Result<(), AttestError> {
        let body =
            custody_codec::to_vec(relationship).map_err(|e| AttestError::Encode(e.to_string()))?;
        let req = self.cbor_post(&format!("/v1/rel/{cid}"), body);
        let req = self.authorize(req);

        let resp = req.send().await?;
        let status = resp.status();

        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(Self::map_status(status, body))
        }
    }

    /// `GET /v1/i?query=match&key=&val=&type=`
    pub async fn index_match(&self, key: &str, val: &str, type_hint: &str) -> Result<Vec<String>, AttestError> {
        let resp = self
            .http
            .get(self.url("/v1/i"))
            .query(&[("query", "match"), ("key", key), ("val", val), ("type", type_hint)])
            .send()
            .await?;
        self.decode_cid_list(resp).await
    }

    /// `GET /v1/i?query=list&key=`
    pub async fn index_list(&self, key: &str) -> Result<Vec<String>, AttestError> {
        let resp = self
            .http
            .get(self.url("/v1/i"))
            .query(&[("query", "list"), ("key", key)])
            .send()
            .await?;
        self.decode_cid_list(resp).await
    }

    /// `GET /v1/cids`
    pub async fn list_cids(&self) -> Result<Vec<String>, AttestError> {
        let resp = self.http.get(self.url("/v1/cids")).send().await?;
        self.decode_cid_list(resp).await
    }

    async fn decode_cid_list(&self, resp: reqwest::Response) -> Result<Vec<String>, AttestError> {
        let status = resp.status();
        if status.is_success() {
            let bytes = resp.bytes().await?;
            custody_codec::from_slice(&bytes).map_err(|e| AttestError::Decode(e.to_string()))
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(Self::map_status(status, body))
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_status_codes_to_error_kinds() {
        assert!(matches!(
            AttestClient::map_status(StatusCode::BAD_REQUEST, String::new()),
            AttestError::NeedsKey
        ));
        assert!(matches!(
            AttestClient::map_status(StatusCode::NOT_FOUND, String::new()),
            AttestError::NotFound
        ));
        match AttestClient::map_status(StatusCode::INTERNAL_SERVER_ERROR, "boom".into()) {
            AttestError::TransportError { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn relationship_side_serializes_lowercase() {
        let rel = Relationship {
            side: RelationSide::Children,
            relation_type: "encrypted".to_string(),
            cid: "bdest".to_string(),
        };
        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["type"], "children");
    }
}
