//! Verifies ProofMode-style PGP evidence bundles: a ZIP of a captured
//! asset, its detached PGP signature, JSON/CSV provenance metadata and
//! their signatures, and an OpenTimestamps proof, all signed by the
//! capture device's key.

use std::{
    collections::HashMap,
    io::{Cursor, Read},
};

use anyhow::{anyhow, bail, Context, Result};
use pgp::{Deserializable, SignedPublicKey, StandaloneSignature};
use serde::{Deserialize, Serialize};
use zip::{read::ZipFile, ZipArchive};

use custody_cid::hash::TeeHasher;

/// Sentinel file ProofMode bundles carry, used to recognize the format.
pub const SENTINEL_FILE: &str = "HowToVerifyProofData.txt";

/// The `*.proof.json` sidecar structure produced by ProofMode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofModeAssetMetadata {
    #[serde(rename = "File Hash SHA256")]
    pub sha256: String,
    #[serde(rename = "File Path")]
    pub file_path: String,
    #[serde(rename = "File Modified")]
    pub file_modified: String,
    #[serde(rename = "File Created")]
    pub file_created: String,
    #[serde(rename = "Proof Generated")]
    pub proof_generated: String,
    #[serde(rename = "Note", default)]
    pub note: String,
}

/// Everything extracted and verified for a single asset in a bundle.
#[derive(Debug, Clone)]
pub struct VerifiedAsset {
    pub metadata: ProofModeAssetMetadata,
    pub sha256: String,
    pub md5: String,
    pub blake3: String,
    pub file_size: u64,
    pub media_type: String,
    pub pubkey_fingerprint: String,
    pub pubkey_armored: Vec<u8>,
    pub ots: Vec<u8>,
    pub gst: Vec<u8>,
    /// The asset's own raw bytes, for callers that need to store it
    /// (e.g. content-address it under its own CID).
    pub asset_bytes: Vec<u8>,
    /// Armored detached PGP signature of the asset bytes (`{sha}.asc`).
    pub asset_signature: Vec<u8>,
    /// Armored detached PGP signature of the JSON metadata (`{sha}.proof.json.asc`).
    pub json_signature: Vec<u8>,
}

/// Checks whether `path` looks like a ProofMode bundle: a `.zip` file
/// containing the sentinel file.
pub fn is_proofmode_file(path: &std::path::Path) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some("zip") {
        return false;
    }

    let Ok(file) = std::fs::File::open(path) else {
        return false;
    };
    let Ok(mut archive) = ZipArchive::new(file) else {
        return false;
    };

    (0..archive.len()).any(|i| {
        archive
            .by_index(i)
            .map(|f| f.name() == SENTINEL_FILE)
            .unwrap_or(false)
    })
}

/// Reads every `*.proof.json` in the bundle, verifying the asset it
/// describes plus its accompanying metadata signatures. Failure of any
/// step is fatal for that asset only — one asset's bad signature, wrong
/// fingerprint, or hash mismatch does not prevent the other assets in the
/// same bundle from being verified and returned.
pub fn verify_bundle(path: &std::path::Path, allowed_fingerprints: &[String]) -> Result<Vec<VerifiedAsset>> {
    let file = std::fs::File::open(path).context("opening bundle")?;
    let mut archive = ZipArchive::new(file).context("not a valid zip archive")?;

    let mut json_metadata: Vec<Vec<u8>> = Vec::new();
    let mut other_entries: HashMap<String, usize> = HashMap::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.name().ends_with(".json") {
            let mut buf = Vec::new();
            entry.read_to_end(&mut buf)?;
            json_metadata.push(buf);
        } else {
            other_entries.insert(entry.name().to_string(), i);
        }
    }

    if json_metadata.is_empty() {
        bail!("missing json metadata file");
    }

    let mut assets = Vec::new();
    for raw in json_metadata {
        match verify_one_json_entry(&mut archive, &other_entries, &raw, allowed_fingerprints) {
            Ok(asset) => assets.push(asset),
            Err(e) => log::warn!("skipping one asset in proofmode bundle {}: {e:#}", path.display()),
        }
    }

    Ok(assets)
}

fn verify_one_json_entry(
    archive: &mut ZipArchive<std::fs::File>,
    other_entries: &HashMap<String, usize>,
    raw: &[u8],
    allowed_fingerprints: &[String],
) -> Result<VerifiedAsset> {
    let metadata: ProofModeAssetMetadata = serde_json::from_slice(raw).context("parsing *.proof.json metadata")?;

    let file_name = std::path::Path::new(&metadata.file_path)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("metadata File Path has no basename"))?
        .to_string();

    let asset = verify_asset(archive, other_entries, &file_name, &metadata.sha256, raw, metadata)?;

    let normalized = asset.pubkey_fingerprint.trim_start_matches("0x").to_uppercase();
    let allowed = allowed_fingerprints
        .iter()
        .any(|f| f.trim_start_matches("0x").to_uppercase() == normalized);
    if !allowed {
        bail!("pgp key fingerprint {} is not in the allow-list", asset.pubkey_fingerprint);
    }

    Ok(asset)
}

fn verify_asset(
    archive: &mut ZipArchive<std::fs::File>,
    entries: &HashMap<String, usize>,
    file_name: &str,
    file_sha: &str,
    json_metadata_bytes: &[u8],
    metadata: ProofModeAssetMetadata,
) -> Result<VerifiedAsset> {
    let pubkey_armored = read_entry(archive, entries, "pubkey.asc")?;
    let (public_key, _) =
        SignedPublicKey::from_armor_single(Cursor::new(&pubkey_armored)).context("parsing pubkey.asc")?;
    let fingerprint = hex::encode_upper(public_key.fingerprint());

    let asset_sig_bytes = read_entry(archive, entries, &format!("{file_sha}.asc"))?;
    let (asset_sig, _) =
        StandaloneSignature::from_armor_single(Cursor::new(&asset_sig_bytes)).context("parsing asset signature")?;

    let media_type = {
        let mut head = read_entry(archive, entries, file_name)?;
        head.truncate(512);
        custody_cid::media::sniff_bytes(&head)
    };

    let asset_bytes = read_entry(archive, entries, file_name)?;
    let mut tee = TeeHasher::new();
    tee.update(&asset_bytes);
    let hashes = tee.finish()?;

    asset_sig
        .verify(&public_key, &asset_bytes)
        .map_err(|_| anyhow!("asset signature verification failed"))?;

    if hashes.sha256 != file_sha {
        bail!("file hash mismatch: computed {} but metadata claims {file_sha}", hashes.sha256);
    }

    let json_sig_bytes = read_entry(archive, entries, &format!("{file_sha}.proof.json.asc"))?;
    let (json_sig, _) = StandaloneSignature::from_armor_single(Cursor::new(&json_sig_bytes))
        .context("parsing json metadata signature")?;
    json_sig
        .verify(&public_key, json_metadata_bytes)
        .map_err(|_| anyhow!("metadata signature verification failed"))?;

    let csv_bytes = read_entry(archive, entries, &format!("{file_sha}.proof.csv"))?;
    let csv_sig_bytes = read_entry(archive, entries, &format!("{file_sha}.proof.csv.asc"))?;
    let (csv_sig, _) = StandaloneSignature::from_armor_single(Cursor::new(&csv_sig_bytes))
        .context("parsing csv metadata signature")?;
    csv_sig
        .verify(&public_key, &csv_bytes)
        .map_err(|_| anyhow!("metadata signature verification failed"))?;

    let ots = read_entry(archive, entries, &format!("{file_sha}.ots"))?;
    let gst = read_entry(archive, entries, &format!("{file_sha}.gst"))?;

    Ok(VerifiedAsset {
        metadata,
        sha256: hashes.sha256,
        md5: hashes.md5,
        blake3: hashes.blake3,
        file_size: hashes.file_size,
        media_type,
        pubkey_fingerprint: fingerprint,
        pubkey_armored,
        ots,
        gst,
        asset_bytes,
        asset_signature: asset_sig_bytes,
        json_signature: json_sig_bytes,
    })
}

fn read_entry(
    archive: &mut ZipArchive<std::fs::File>,
    entries: &HashMap<String, usize>,
    name: &str,
) -> Result<Vec<u8>> {
    let idx = *entries
        .get(name)
        .ok_or_else(|| anyhow!("bundle is missing required entry {name}"))?;
    let mut entry: ZipFile = archive.by_index(idx)?;
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_non_zip_as_not_proofmode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-zip.txt");
        std::fs::write(&path, b"hello").unwrap();
        assert!(!is_proofmode_file(&path));
    }

    #[test]
    fn recognizes_wrong_extension_as_not_proofmode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.tar");
        std::fs::write(&path, b"PK\x03\x04").unwrap();
        assert!(!is_proofmode_file(&path));
    }
}
