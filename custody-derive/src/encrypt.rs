//! Encrypt-file flow: whole-file authenticated streaming encryption into a
//! second, related asset.

use custody_attest_client::{AttributeTuple, RelationSide, Relationship};
use dryoc::types::Bytes;

use crate::{
    context::{move_into_files_dir, DeriveContext},
    error::DeriveError,
};

/// Encrypts the file stored under `source_cid`, writing the new key under
/// the output CID and recording the `encrypted` relationship + attribute.
pub async fn encrypt_cid(ctx: &DeriveContext, source_cid: &str) -> Result<String, DeriveError> {
    let source_path = ctx.source_path(source_cid);
    if !source_path.exists() {
        return Err(DeriveError::SourceNotFound(source_cid.to_string()));
    }

    let key = custody_crypt::generate_key();
    let plaintext_size = std::fs::metadata(&source_path)?.len();

    let mut tmp = tempfile::NamedTempFile::new_in(&ctx.temp_dir)?;
    let source_file = std::fs::File::open(&source_path)?;
    custody_crypt::encrypt_stream(source_file, &mut tmp, plaintext_size, &key)?;

    let hashes = custody_cid::compute_file_cid(tmp.path())?;

    ctx.keystore
        .put(&hashes.cid, "content", key.as_slice())
        .map_err(|e| DeriveError::IOError(e.to_string()))?;

    move_into_files_dir(tmp, &ctx.files_dir, &hashes.cid)?;

    ctx.attest
        .add_relationship(
            source_cid,
            &Relationship {
                side: RelationSide::Children,
                relation_type: "encrypted".to_string(),
                cid: hashes.cid.clone(),
            },
        )
        .await?;

    ctx.attest
        .set_attestations(
            &hashes.cid,
            &[AttributeTuple {
                key: "encryption_type".to_string(),
                value: serde_json::json!("secretstream"),
                type_hint: None,
                enc_key: None,
            }],
            false,
        )
        .await?;

    Ok(hashes.cid)
}
