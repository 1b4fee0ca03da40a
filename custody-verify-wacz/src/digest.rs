use chrono::{DateTime, Utc};
use serde::Deserialize;

/// `datapackage-digest.json` — the signed summary of the package.
#[derive(Debug, Clone, Deserialize)]
pub struct DigestData {
    pub path: String,
    pub hash: String,
    #[serde(rename = "signedData")]
    pub signed_data: SignedData,
}

/// The `signedData` sub-object, shaped differently for the anonymous-key
/// and domain-signed variants; unused fields are simply absent.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedData {
    pub hash: String,
    pub signature: String,
    #[serde(rename = "publicKey", default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(rename = "domainCert", default)]
    pub domain_cert: Option<String>,
    #[serde(rename = "timeSignature", default)]
    pub time_signature: Option<String>,
    #[serde(rename = "timestampCert", default)]
    pub timestamp_cert: Option<String>,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub software: String,
    #[serde(default)]
    pub version: String,
}

/// `datapackage.json` — the web-archive's file manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageData {
    #[serde(default)]
    pub profile: String,
    pub resources: Vec<Resource>,
    #[serde(rename = "wacz_version", default)]
    pub wacz_version: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub software: String,
    pub created: DateTime<Utc>,
    #[serde(default = "default_modified")]
    pub modified: DateTime<Utc>,
}

fn default_modified() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    pub name: String,
    pub path: String,
    pub hash: String,
    pub bytes: u64,
}
