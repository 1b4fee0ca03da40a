use std::{collections::HashMap, io::Write};

use axum::extract::{Json, Query, State};
use serde::Deserialize;
use serde_json::{Map, Value};

use custody_cid::hash::TeeHasher;
use custody_ingest::attributes::hoist_private_attributes;

use crate::{error::WebhookError, state::SharedState};

/// The crawl-finished event envelope. Upstream Browsertrix doesn't
/// include crawl tags in this payload by default. This system takes `tags`
/// directly on the envelope instead, avoiding an extra authenticated
/// round trip and the Browsertrix-account credentials it would require.
#[derive(Debug, Deserialize)]
pub struct BrowsertrixEvent {
    pub event: String,
    #[serde(rename = "orgId")]
    pub org_id: String,
    #[serde(rename = "itemId")]
    pub item_id: String,
    pub resources: Vec<BrowsertrixResource>,
    #[serde(rename = "reviewStatusLabel")]
    pub review_status_label: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BrowsertrixResource {
    pub name: String,
    pub path: String,
    pub hash: String,
    pub size: u64,
    #[serde(rename = "crawlId")]
    pub crawl_id: String,
}

fn project_id_from_tags(tags: &[String]) -> Option<String> {
    tags.iter().find_map(|tag| tag.strip_prefix("project_id:").map(|id| id.to_string()))
}

/// `POST /browsertrix?s=<secret>`
pub async fn handle_browsertrix(
    State(state): State<SharedState>,
    Query(query): Query<HashMap<String, String>>,
    Json(event): Json<BrowsertrixEvent>,
) -> Result<axum::Json<Value>, WebhookError> {
    let secret = query.get("s").cloned().unwrap_or_default();
    if state.browsertrix_secret.as_deref() != Some(secret.as_str()) {
        return Err(WebhookError::Unauthorized("invalid secret".to_string()));
    }

    let accepted = match event.event.as_str() {
        "crawlReviewed" => true,
        "crawlFinished" => event.review_status_label.as_deref() == Some("auto-accept"),
        other => {
            log::info!("browsertrix: ignoring event {other}");
            false
        }
    };
    if !accepted {
        return Ok(axum::Json(serde_json::json!({ "status": "ignored" })));
    }

    let Some(project_id) = project_id_from_tags(&event.tags) else {
        return Err(WebhookError::BadRequest("missing project_id tag".to_string()));
    };

    let resource = event
        .resources
        .first()
        .ok_or_else(|| WebhookError::BadRequest("missing resources".to_string()))?;

    let mut resp = state
        .http
        .get(&resource.path)
        .send()
        .await
        .map_err(|e| WebhookError::Internal(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(WebhookError::Internal(format!("failed to download wacz: {}", resp.status())));
    }

    let mut tmp = tempfile::NamedTempFile::new_in(&state.temp_dir)?;
    let mut tee = TeeHasher::new();
    while let Some(chunk) = resp.chunk().await.map_err(|e| WebhookError::Internal(e.to_string()))? {
        tee.update(&chunk);
        tmp.write_all(&chunk)?;
    }
    tmp.flush()?;
    let hashes = tee.finish().map_err(WebhookError::from)?;

    let expected_hash = resource.hash.strip_prefix("sha256:").unwrap_or(&resource.hash);
    if hashes.sha256 != expected_hash {
        return Err(WebhookError::BadRequest(format!(
            "hash mismatch: computed {} but resource claims {expected_hash}",
            hashes.sha256
        )));
    }
    if hashes.file_size != resource.size {
        return Err(WebhookError::BadRequest(format!(
            "size mismatch: got {} bytes but resource claims {}",
            hashes.file_size, resource.size
        )));
    }

    let wacz_metadata = custody_verify_wacz::get_verified_metadata(tmp.path(), &[], &state.browsertrix_wacz_domains)
        .map_err(|e| WebhookError::BadRequest(e.to_string()))?;

    let mut metadata = Map::new();
    for (k, v) in wacz_metadata {
        metadata.insert(k, v);
    }
    metadata.insert("asset_origin_id".to_string(), Value::String(resource.crawl_id.clone()));
    metadata.insert("asset_origin_type".to_string(), Value::Array(vec![Value::String("wacz".to_string())]));
    metadata.insert("project_id".to_string(), Value::String(project_id));
    metadata.insert("file_name".to_string(), Value::String(resource.name.clone()));
    metadata.insert("crawl_org_id".to_string(), Value::String(event.org_id.clone()));
    metadata.insert("crawl_item_id".to_string(), Value::String(event.item_id.clone()));

    let tuples = hoist_private_attributes(&hashes.cid, metadata, &state.keystore).map_err(WebhookError::from)?;
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

    log::info!("browsertrix: processed with cid {}", hashes.cid);
    Ok(axum::Json(serde_json::json!({ "cid": hashes.cid })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_project_id_tag_among_others() {
        let tags = vec!["auto-accept".to_string(), "project_id:abc123".to_string()];
        assert_eq!(project_id_from_tags(&tags).as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_project_id_tag_is_none() {
        let tags = vec!["auto-accept".to_string()];
        assert_eq!(project_id_from_tags(&tags), None);
    }
}
