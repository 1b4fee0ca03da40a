//! Verification of WACZ web-archive packages: package/resource hash
//! integrity, and either an anonymous-key or a domain-certified signature
//! over the package digest, per the WACZ auth spec
//! <https://specs.webrecorder.net/wacz-auth/0.1.0/>.

pub mod anon_sig;
pub mod cert;
pub mod digest;
pub mod timestamp;
pub mod warc;

use std::{
    collections::HashMap,
    io::Read,
    path::Path,
};

use anyhow::{anyhow, bail, Result};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest as _, Sha256};
use zip::ZipArchive;

use digest::{DigestData, PackageData};

const BASE64: base64::engine::general_purpose::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// SHA-256 fingerprints of timestamp-authority root certs this system
/// trusts, mirroring the allow-list Authsign's timestamping relies on.
const TRUSTED_TIMESTAMP_FINGERPRINTS: &[&str] = &[
    // freetsa.org Root CA (self-signed); Authsign uses this TSA.
    "a6379e7cecc05faa3cbf076013d745e327bbbaa38c0b9af22469d4701d18aabc",
    // DigiCert's CA for timestamping operations.
    "281734d4592d1291d27190709cb510b07e22c405d5e0d6119b70e73589f98acf",
];

/// An entry in an allow-list of trusted anonymous public keys or signer
/// domains, each carrying a human-readable name for attribution.
#[derive(Debug, Clone)]
pub struct AllowedKey {
    pub key: String,
    pub name: String,
}

/// The parsed, verified contents of a WACZ file.
pub struct WaczFileData {
    pub digest_data: DigestData,
    pub package_data: PackageData,
    pub user_agent: Option<String>,
    pub key_name: String,
}

/// Returns true if `path` has a `.wacz` extension and its zip listing
/// contains a `datapackage.json` entry.
pub fn is_wacz_file(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    if path.extension().and_then(|e| e.to_str()) != Some("wacz") {
        return false;
    }
    let Ok(file) = std::fs::File::open(path) else {
        return false;
    };
    let Ok(archive) = ZipArchive::new(file) else {
        return false;
    };
    archive.file_names().any(|name| name == "datapackage.json")
}

fn read_zip_entry(archive: &mut ZipArchive<std::fs::File>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive.by_name(name).map_err(|e| anyhow!("missing {name}: {e}"))?;
    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut buf)?;
    Ok(buf)
}

fn verify_file_hashes(archive: &mut ZipArchive<std::fs::File>, package_data: &PackageData) -> Result<()> {
    for resource in &package_data.resources {
        let mut entry = archive
            .by_name(&resource.path)
            .map_err(|_| anyhow!("missing file {}", resource.path))?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut entry, &mut hasher)?;
        let expected = format!("sha256:{}", hex::encode(hasher.finalize()));
        if resource.hash != expected {
            bail!("hash mismatch for {}", resource.path);
        }
    }
    Ok(())
}

/// Reads a WACZ archive, verifies the package digest hash, every listed
/// resource's hash, and the digest's anonymous-key or domain signature,
/// returning the parsed metadata on success.
pub fn read_and_verify_wacz_metadata(
    path: impl AsRef<Path>,
    anon_keys: &[AllowedKey],
    domains: &[AllowedKey],
) -> Result<WaczFileData> {
    let file = std::fs::File::open(path.as_ref())?;
    let mut archive = ZipArchive::new(file)?;

    let data_package_bytes = read_zip_entry(&mut archive, "datapackage.json")?;
    let digest_bytes = read_zip_entry(&mut archive, "datapackage-digest.json")?;

    let digest_data: DigestData = serde_json::from_slice(&digest_bytes)?;
    let package_data: PackageData = serde_json::from_slice(&data_package_bytes)?;

    let expected_hash = format!("sha256:{}", hex::encode(Sha256::digest(&data_package_bytes)));
    if digest_data.hash != expected_hash {
        bail!("hash mismatch");
    }

    verify_file_hashes(&mut archive, &package_data)?;

    let metadata_signature = BASE64
        .decode(&digest_data.signed_data.signature)
        .map_err(|e| anyhow!("invalid base64 signature: {e}"))?;

    let (verified, key_name) = if let Some(public_key) = &digest_data.signed_data.public_key {
        let allowed = anon_keys
            .iter()
            .find(|k| &k.key == public_key)
            .ok_or_else(|| anyhow!("wacz public key was not in allow-list"))?;

        let pubkey_der = BASE64
            .decode(public_key)
            .map_err(|e| anyhow!("invalid base64 public key: {e}"))?;
        let ok = anon_sig::verify_anonymous_signature(
            digest_data.signed_data.hash.as_bytes(),
            &metadata_signature,
            &pubkey_der,
        )?;
        (ok, allowed.name.clone())
    } else if let Some(domain) = &digest_data.signed_data.domain {
        let allowed = domains
            .iter()
            .find(|k| &k.key == domain)
            .ok_or_else(|| anyhow!("wacz signer domain was not in allow-list"))?;

        let domain_cert = digest_data
            .signed_data
            .domain_cert
            .as_ref()
            .ok_or_else(|| anyhow!("missing domain cert"))?;
        let time_signature_b64 = digest_data
            .signed_data
            .time_signature
            .as_ref()
            .ok_or_else(|| anyhow!("missing time signature or timestamp cert"))?;
        let timestamp_cert = digest_data
            .signed_data
            .timestamp_cert
            .as_ref()
            .ok_or_else(|| anyhow!("missing time signature or timestamp cert"))?;
        let time_signature = BASE64
            .decode(time_signature_b64)
            .map_err(|e| anyhow!("invalid base64 time signature: {e}"))?;

        let ok = verify_domain_signature(
            digest_data.signed_data.hash.as_bytes(),
            domain,
            &metadata_signature,
            domain_cert,
            &time_signature,
            timestamp_cert,
            digest_data.signed_data.created,
        )?;
        (ok, allowed.name.clone())
    } else {
        bail!("no public key or domain");
    };

    if !verified {
        bail!("signature verification failed");
    }

    let user_agent = find_warc_user_agent(&mut archive, &package_data);

    Ok(WaczFileData {
        digest_data,
        package_data,
        user_agent,
        key_name,
    })
}

fn find_warc_user_agent(archive: &mut ZipArchive<std::fs::File>, package_data: &PackageData) -> Option<String> {
    let target = package_data.resources.iter().find(|r| {
        r.path.starts_with("archive/") && (r.path.ends_with(".warc") || r.path.ends_with(".warc.gz"))
    })?;
    let mut entry = archive.by_name(&target.path).ok()?;
    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut buf).ok()?;
    warc::find_user_agent(&buf)
}

/// Per the WACZ auth spec's domain-name-identity-timestamp-validation flow:
/// the domain cert covers `domain`, its key signed `message`, the
/// timestamp-authority cert is in the trusted-fingerprint allow-list, the
/// RFC 3161 token covers the signature bytes, and the token's time and the
/// claimed `signature_created` time agree within a 10 minute skew and fall
/// inside the timestamp cert's validity window.
#[allow(clippy::too_many_arguments)]
fn verify_domain_signature(
    message: &[u8],
    domain: &str,
    signature_bytes: &[u8],
    domain_cert_pem: &str,
    time_signature: &[u8],
    timestamp_cert_pem: &str,
    signature_created: DateTime<Utc>,
) -> Result<bool> {
    let domain_chain = cert::CertChain::parse(domain_cert_pem)?;
    let domain_cert = cert::verify_chain(&domain_chain, None)?;
    cert::verify_hostname(domain_cert, domain)?;
    cert::require_timestamping_eku(domain_cert).ok(); // domain cert isn't required to carry timestamping EKU

    verify_signature_with_spki(domain_cert, message, signature_bytes)?;

    let timestamp_fingerprints: Vec<String> = TRUSTED_TIMESTAMP_FINGERPRINTS.iter().map(|s| s.to_string()).collect();
    let timestamp_chain = cert::CertChain::parse(timestamp_cert_pem)?;
    let timestamp_cert = cert::verify_chain(&timestamp_chain, Some(&timestamp_fingerprints))?;
    cert::require_timestamping_eku(timestamp_cert)?;

    let sign_time = verify_timestamp(signature_bytes, time_signature, timestamp_cert)?;

    let not_before = timestamp_cert.tbs_certificate.validity.not_before.to_date_time();
    let not_after = timestamp_cert.tbs_certificate.validity.not_after.to_date_time();
    let not_before: DateTime<Utc> = not_before.try_into().map_err(|_| anyhow!("invalid cert validity"))?;
    let not_after: DateTime<Utc> = not_after.try_into().map_err(|_| anyhow!("invalid cert validity"))?;
    if signature_created < not_before || signature_created > not_after {
        bail!("timestamp cert not valid at creation time");
    }

    if (signature_created - sign_time).abs() > Duration::minutes(10) {
        bail!("timestamp too far from signature creation time");
    }

    Ok(true)
}

fn verify_signature_with_spki(cert: &x509_cert::Certificate, message: &[u8], signature_bytes: &[u8]) -> Result<()> {
    let spki_der = der::Encode::to_der(&cert.tbs_certificate.subject_public_key_info)
        .map_err(|e| anyhow!("failed to encode domain cert SPKI: {e}"))?;
    let ok = anon_sig::verify_anonymous_signature(message, signature_bytes, &spki_der)?;
    if !ok {
        bail!("domain signature verification failed");
    }
    Ok(())
}

fn verify_timestamp(message: &[u8], raw_token: &[u8], timestamp_cert: &x509_cert::Certificate) -> Result<DateTime<Utc>> {
    let parsed = timestamp::parse_timestamp_token(raw_token)?;
    let encoded_message = BASE64.encode(message);
    timestamp::verify_hashed_message(&parsed, &encoded_message)?;
    timestamp::verify_token_signature(raw_token, timestamp_cert)?;
    Ok(parsed.time)
}

/// Builds the final attestable metadata map for a verified WACZ file,
/// matching the shape used across the other preprocessors: string-valued
/// fields flattened for attestation, collections kept as typed values.
pub fn get_verified_metadata(
    path: impl AsRef<Path>,
    anon_keys: &[AllowedKey],
    domains: &[AllowedKey],
) -> Result<HashMap<String, serde_json::Value>> {
    let data = read_and_verify_wacz_metadata(path, anon_keys, domains)?;

    let wacz = if let Some(public_key) = &data.digest_data.signed_data.public_key {
        serde_json::json!({
            "hash": data.digest_data.signed_data.hash,
            "signature": data.digest_data.signed_data.signature,
            "publicKey": public_key,
            "created": data.package_data.created.to_rfc3339(),
            "software": data.package_data.software,
        })
    } else {
        serde_json::json!({
            "hash": data.digest_data.signed_data.hash,
            "signature": data.digest_data.signed_data.signature,
            "version": data.digest_data.signed_data.version,
            "domain": data.digest_data.signed_data.domain,
            "domainCert": data.digest_data.signed_data.domain_cert,
            "timeSignature": data.digest_data.signed_data.signature,
            "timestampCert": data.digest_data.signed_data.timestamp_cert,
            "created": data.package_data.created.to_rfc3339(),
            "software": data.package_data.software,
        })
    };

    let modified = if data.package_data.modified.timestamp() == 0 {
        data.package_data.created
    } else {
        data.package_data.modified
    };

    let mut metadata = HashMap::new();
    metadata.insert("last_modified".to_string(), serde_json::json!(modified.to_rfc3339()));
    metadata.insert("time_created".to_string(), serde_json::json!(data.package_data.created.to_rfc3339()));
    metadata.insert("media_type".to_string(), serde_json::json!("application/wacz"));
    metadata.insert("asset_origin_type".to_string(), serde_json::json!(["wacz"]));
    metadata.insert("crawl_user_agent".to_string(), serde_json::json!(data.user_agent));
    metadata.insert("wacz".to_string(), wacz);
    metadata.insert("asset_origin_sig_key_name".to_string(), serde_json::json!(data.key_name));

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_wacz_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-wacz.zip");
        std::fs::write(&path, b"PK\x03\x04").unwrap();
        assert!(!is_wacz_file(&path));
    }

    #[test]
    fn missing_file_is_rejected() {
        assert!(!is_wacz_file("/nonexistent/path/does/not/exist.wacz"));
    }
}
