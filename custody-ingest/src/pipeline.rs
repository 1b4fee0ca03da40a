//! The ingest algorithm: discover → class-detect → verify/describe →
//! `Uploading` → per-asset CID+attribute transmission → `Success`/`Error`.
//!
//! `Uploading → Success` here re-derives the CID from the bytes just
//! transmitted, so the row's `cid` always matches what was actually written,
//! rather than trusting a CID computed earlier in the run.

use std::{
    io::{Cursor, Read, Write},
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{Map, Value};

use custody_attest_client::{AttestClient, RelationSide, Relationship};
use custody_cid::{hash::TeeHasher, FileHashes};
use custody_keystore::KeyStore;
use custody_verify_wacz::AllowedKey as WaczAllowedKey;
use sqlx::PgPool;

use crate::{
    attributes::hoist_private_attributes,
    db::{self, FileStatus},
    error::IngestError,
    metadata::{self, FileClass},
    project::Project,
};

/// Shared handles and allow-lists the pipeline needs for every invocation,
/// owned by the caller (CLI, webhook, or watcher binary) and passed by
/// reference — never stashed in module-level statics.
pub struct IngestContext {
    pub pool: PgPool,
    pub keystore: KeyStore,
    pub attest: AttestClient,
    pub files_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub pgp_allowed_fingerprints: Vec<String>,
    pub wacz_anon_keys: Vec<WaczAllowedKey>,
    pub wacz_domains: Vec<WaczAllowedKey>,
}

/// The result of a successful ingest.
pub struct IngestOutcome {
    pub cid: String,
}

enum AssetSource {
    /// Stream directly from a file already on disk (generic, WACZ).
    File(PathBuf),
    /// Already-buffered bytes extracted from a bundle (a PGP-bundle asset).
    Bytes(Vec<u8>),
}

struct Asset {
    metadata: Map<String, Value>,
    source: AssetSource,
}

/// A file's position in the sync root, used to attach project attribution.
/// `relative_path` is forward-slash-separated and relative to the sync
/// root (the caller — the watcher's initial walk or its event dispatch —
/// already has the sync root in scope, so it computes this once rather
/// than the pipeline re-deriving it from `project.project_path`).
pub struct ProjectContext<'a> {
    pub project: &'a Project,
    pub relative_path: String,
}

/// Runs the ingest algorithm on a path already known to have passed the
/// exclusion rules (see [`metadata::should_include_file`]).
pub async fn ingest_path(
    ctx: &IngestContext,
    path: &Path,
    project: Option<&ProjectContext<'_>>,
) -> Result<IngestOutcome, IngestError> {
    let path_str = path.to_string_lossy().to_string();

    let row = db::upsert_and_return(&ctx.pool, &path_str).await?;
    match row.status {
        FileStatus::Success => {
            let cid = row
                .cid
                .ok_or_else(|| IngestError::IOError("row marked Success carries no cid".to_string()))?;
            return Ok(IngestOutcome { cid });
        }
        FileStatus::Error => {
            return Err(IngestError::VerificationFailed(
                row.error.unwrap_or_else(|| "previously failed with no recorded message".to_string()),
            ));
        }
        FileStatus::Uploading => {
            log::info!("retrying previously-interrupted upload for {path_str}");
        }
        FileStatus::Found => {}
    }

    match run_upload(ctx, &path_str, path, project).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            db::set_error(&ctx.pool, &path_str, &e.to_string()).await?;
            Err(e)
        }
    }
}

async fn run_upload(
    ctx: &IngestContext,
    path_str: &str,
    path: &Path,
    project: Option<&ProjectContext<'_>>,
) -> Result<IngestOutcome, IngestError> {
    let class = metadata::detect_class(path)?;
    let assets = match class {
        FileClass::Generic => vec![generic_asset(path)?],
        FileClass::Wacz => vec![wacz_asset(ctx, path)?],
        FileClass::PgpBundle => pgp_bundle_assets(path, &ctx.pgp_allowed_fingerprints)?,
    };

    if assets.is_empty() {
        return Err(IngestError::VerificationFailed("bundle contained no usable assets".to_string()));
    }

    let whole_file_sha256 = custody_cid::compute_file_cid(path).map(|h| h.sha256).unwrap_or_default();
    db::set_uploading(&ctx.pool, path_str, &whole_file_sha256).await?;

    let mut first_cid: Option<String> = None;
    let mut last_error: Option<IngestError> = None;

    for mut asset in assets {
        if let Some(pc) = project {
            metadata::attach_project_fields(&mut asset.metadata, pc.project, &pc.relative_path);
        }

        match upload_asset(ctx, asset).await {
            Ok(cid) => {
                if first_cid.is_none() {
                    first_cid = Some(cid);
                }
            }
            Err(e) => {
                log::warn!("asset in {path_str} failed: {e}");
                if class != FileClass::PgpBundle {
                    return Err(e);
                }
                // a single asset's failure inside a bundle is independent
                // of the others; keep going.
                last_error = Some(e);
            }
        }
    }

    match first_cid {
        Some(cid) => {
            db::set_success(&ctx.pool, path_str, &cid).await?;
            Ok(IngestOutcome { cid })
        }
        None => Err(last_error.unwrap_or_else(|| {
            IngestError::VerificationFailed("every asset in the bundle failed verification".to_string())
        })),
    }
}

/// Streams an asset's bytes through the CID/multi-hash tee while writing a
/// temp copy, attaches the "private" hoist rule, transmits attributes, and
/// moves the temp file into the files directory under its CID.
async fn upload_asset(ctx: &IngestContext, asset: Asset) -> Result<String, IngestError> {
    let mut tmp = tempfile::NamedTempFile::new_in(&ctx.temp_dir)?;
    let hashes = match asset.source {
        AssetSource::File(path) => {
            let src = std::fs::File::open(&path)?;
            stream_copy_and_hash(src, &mut tmp)?
        }
        AssetSource::Bytes(bytes) => stream_copy_and_hash(Cursor::new(bytes), &mut tmp)?,
    };

    let tuples = hoist_private_attributes(&hashes.cid, asset.metadata, &ctx.keystore)
        .map_err(|e| IngestError::IOError(e.to_string()))?;

    ctx.attest.set_attestations(&hashes.cid, &tuples, true).await?;

    move_into_files_dir(tmp, &ctx.files_dir, &hashes.cid)?;

    Ok(hashes.cid)
}

fn stream_copy_and_hash(mut reader: impl Read, mut writer: impl Write) -> Result<FileHashes, IngestError> {
    let mut tee = TeeHasher::new();
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        tee.update(&buf[..n]);
        writer.write_all(&buf[..n])?;
    }
    tee.finish().map_err(|e| IngestError::IOError(e.to_string()))
}

/// Moves `tmp` into `{files_dir}/{cid}`, falling back to copy+unlink when
/// the temp directory and files directory don't share a filesystem (so
/// `persist`'s atomic rename can't cross devices).
fn move_into_files_dir(tmp: tempfile::NamedTempFile, files_dir: &Path, cid: &str) -> Result<(), IngestError> {
    std::fs::create_dir_all(files_dir)?;
    let dest = files_dir.join(cid);
    if dest.exists() {
        // Idempotent: the same bytes were already ingested under this CID.
        return Ok(());
    }
    match tmp.persist(&dest) {
        Ok(_) => Ok(()),
        Err(persist_err) => {
            let tmp_path = persist_err.file.path().to_path_buf();
            std::fs::copy(&tmp_path, &dest)?;
            std::fs::remove_file(&tmp_path)?;
            Ok(())
        }
    }
}

fn generic_asset(path: &Path) -> Result<Asset, IngestError> {
    let media_type = custody_cid::media::sniff_file(path)?;
    let metadata = metadata::generic_metadata(path, &media_type)?;
    Ok(Asset { metadata, source: AssetSource::File(path.to_path_buf()) })
}

fn wacz_asset(ctx: &IngestContext, path: &Path) -> Result<Asset, IngestError> {
    let wacz_metadata = custody_verify_wacz::get_verified_metadata(path, &ctx.wacz_anon_keys, &ctx.wacz_domains)
        .map_err(|e| IngestError::VerificationFailed(e.to_string()))?;

    let file_name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();

    let mut metadata = Map::new();
    metadata.insert("asset_origin_id".to_string(), Value::String(file_name.clone()));
    metadata.insert("file_name".to_string(), Value::String(file_name));
    for (k, v) in wacz_metadata {
        metadata.insert(k, v);
    }

    Ok(Asset { metadata, source: AssetSource::File(path.to_path_buf()) })
}

fn pgp_bundle_assets(path: &Path, allowed_fingerprints: &[String]) -> Result<Vec<Asset>, IngestError> {
    let verified = custody_verify_pgp::verify_bundle(path, allowed_fingerprints)
        .map_err(|e| IngestError::VerificationFailed(e.to_string()))?;

    let mut assets = Vec::with_capacity(verified.len());
    for v in verified {
        let file_name = Path::new(&v.metadata.file_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| v.metadata.file_path.clone());

        let proofmode = serde_json::json!({
            "metadata": v.metadata,
            "meta_sig": STANDARD.encode(&v.json_signature),
            "media_sig": STANDARD.encode(&v.asset_signature),
            "pubkey": STANDARD.encode(&v.pubkey_armored),
            "ots": STANDARD.encode(&v.ots),
            "gst": STANDARD.encode(&v.gst),
        });

        let mut metadata = Map::new();
        metadata.insert(
            "private".to_string(),
            serde_json::json!({ "proofmode": proofmode }),
        );
        metadata.insert("file_name".to_string(), Value::String(file_name.clone()));
        metadata.insert("asset_origin_id".to_string(), Value::String(file_name));
        metadata.insert("asset_origin_type".to_string(), Value::Array(vec![Value::String("folder".to_string())]));
        metadata.insert("media_type".to_string(), Value::String(v.media_type.clone()));
        metadata.insert("sha256".to_string(), Value::String(v.sha256.clone()));
        metadata.insert("md5".to_string(), Value::String(v.md5.clone()));
        metadata.insert("blake3".to_string(), Value::String(v.blake3.clone()));
        metadata.insert("file_size".to_string(), Value::Number(v.file_size.into()));

        assets.push(Asset { metadata, source: AssetSource::Bytes(v.asset_bytes) });
    }

    Ok(assets)
}

/// Records a derived-artifact relationship edge through the attestation
/// client, used by `custody-derive` for both the encrypt-file and
/// provenance-injection flows.
pub async fn add_relationship(
    attest: &AttestClient,
    source_cid: &str,
    side: RelationSide,
    label: &str,
    other_cid: &str,
) -> Result<(), IngestError> {
    attest
        .add_relationship(
            source_cid,
            &Relationship { side, relation_type: label.to_string(), cid: other_cid.to_string() },
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor as IoCursor;

    #[test]
    fn stream_copy_and_hash_matches_whole_buffer_hashing() {
        let mut out = Vec::new();
        let hashes = stream_copy_and_hash(IoCursor::new(b"hello\n".to_vec()), &mut out).unwrap();
        assert_eq!(out, b"hello\n");
        assert_eq!(hashes.sha256, "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03");
    }
}
