use std::io::Write;

use axum::extract::{Multipart, State};
use serde_json::{Map, Value};

use custody_attest_client::AttributeTuple;
use custody_cid::hash::TeeHasher;
use custody_ingest::attributes::hoist_private_attributes;

use crate::{error::WebhookError, state::SharedState};

/// `POST /generic` — multipart upload of `file` (binary) and `metadata`
/// (JSON or CBOR). The file part is streamed straight into a temp file
/// through the CID tee-hash, never buffered whole.
pub async fn handle_generic(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<axum::Json<Value>, WebhookError> {
    let mut tmp = tempfile::NamedTempFile::new_in(&state.temp_dir)?;
    let mut tee = TeeHasher::new();
    let mut saw_file = false;
    let mut metadata_bytes: Option<Vec<u8>> = None;
    let mut metadata_is_cbor = false;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| WebhookError::BadRequest(e.to_string()))?
    {
        match field.name() {
            Some("metadata") => {
                metadata_is_cbor = field
                    .content_type()
                    .map(|ct| ct.contains("cbor"))
                    .unwrap_or(false);
                metadata_bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| WebhookError::BadRequest(e.to_string()))?
                        .to_vec(),
                );
            }
            Some("file") => {
                saw_file = true;
                while let Some(chunk) = field.chunk().await.map_err(|e| WebhookError::BadRequest(e.to_string()))? {
                    tee.update(&chunk);
                    tmp.write_all(&chunk)?;
                }
            }
            _ => {}
        }
    }

    if !saw_file {
        return Err(WebhookError::BadRequest("missing \"file\" part".to_string()));
    }
    tmp.flush()?;

    let metadata_bytes = metadata_bytes.unwrap_or_default();
    let metadata: Map<String, Value> = if metadata_bytes.is_empty() {
        Map::new()
    } else if metadata_is_cbor {
        custody_codec::from_slice::<Value>(&metadata_bytes)
            .map_err(|e| WebhookError::BadRequest(e.to_string()))?
            .as_object()
            .cloned()
            .ok_or_else(|| WebhookError::BadRequest("metadata must be a map".to_string()))?
    } else {
        serde_json::from_slice::<Value>(&metadata_bytes)
            .map_err(|e| WebhookError::BadRequest(e.to_string()))?
            .as_object()
            .cloned()
            .ok_or_else(|| WebhookError::BadRequest("metadata must be a map".to_string()))?
    };

    let hashes = tee.finish().map_err(WebhookError::from)?;

    let tuples: Vec<AttributeTuple> =
        hoist_private_attributes(&hashes.cid, metadata, &state.keystore).map_err(WebhookError::from)?;
    state.attest.set_attestations(&hashes.cid, &tuples, true).await?;

    std::fs::create_dir_all(&state.files_dir)?;
    let dest = state.files_dir.join(&hashes.cid);
    if !dest.exists() {
        match tmp.persist(&dest) {
            Ok(_) => {}
            Err(persist_err) => {
                let tmp_path = persist_err.file.path().to_path_buf();
                std::fs::copy(&tmp_path, &dest)?;
                std::fs::remove_file(&tmp_path)?;
            }
        }
    }

    Ok(axum::Json(serde_json::json!({ "cid": hashes.cid })))
}
