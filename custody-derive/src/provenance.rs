//! Provenance-injection flow.
//!
//! Loads a named manifest template, resolves its `{{attr}}` placeholders
//! against the source asset's attestations, hands the filled manifest and a
//! correctly-extensioned copy of the source to an external c2patool-style
//! binary, then records the export on the source and registers the output
//! under its own CID.

use std::path::{Path, PathBuf};

use custody_attest_client::{AttributeOptions, RelationSide, Relationship};
use serde_json::Value;

use crate::{
    context::{move_into_files_dir, DeriveContext},
    error::DeriveError,
};

/// Extensions c2patool accepts, keyed by sniffed media type. Mirrors the Go
/// implementation's switch over `http.DetectContentType` results; file types
/// outside this set aren't supported by the tool.
fn extension_for_media_type(media_type: &str) -> Option<&'static str> {
    match media_type {
        "video/x-msvideo" | "video/avi" => Some("avi"),
        "image/jpeg" => Some("jpeg"),
        "audio/mpeg" => Some("mp3"),
        "video/mp4" | "audio/mp4" => Some("mp4"),
        "image/png" => Some("png"),
        "audio/wav" | "audio/wave" | "audio/x-wav" => Some("wav"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Recursively replaces `"{{attr}}"` leaves with the named attribute's value,
/// fetched live from the attestation service. Non-string and non-`{{..}}`
/// values pass through untouched.
async fn replace_vars(ctx: &DeriveContext, cid: &str, value: Value) -> Result<Value, DeriveError> {
    match value {
        Value::String(s) => {
            if let Some(attr) = s.strip_prefix("{{").and_then(|rest| rest.strip_suffix("}}")) {
                let raw = ctx
                    .attest
                    .get_attribute_raw(cid, attr, &AttributeOptions::default())
                    .await?;
                let parsed: Value = serde_json::from_slice(&raw)
                    .map_err(|e| DeriveError::IOError(format!("{attr}: invalid attestation JSON: {e}")))?;
                Ok(parsed)
            } else {
                Ok(Value::String(s))
            }
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(Box::pin(replace_vars(ctx, cid, item)).await?);
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k, Box::pin(replace_vars(ctx, cid, v)).await?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other),
    }
}

fn template_path(ctx: &DeriveContext, manifest_name: &str) -> PathBuf {
    ctx.template_dir.join(format!("{manifest_name}.json"))
}

/// Injects `manifest_name`'s template into the asset stored under
/// `source_cid`, returning the CID of the newly-exported file.
pub async fn inject_provenance(
    ctx: &DeriveContext,
    source_cid: &str,
    manifest_name: &str,
) -> Result<String, DeriveError> {
    let source_path = ctx.source_path(source_cid);
    if !source_path.exists() {
        return Err(DeriveError::SourceNotFound(source_cid.to_string()));
    }

    let tmpl_path = template_path(ctx, manifest_name);
    let tmpl_bytes = std::fs::read(&tmpl_path)
        .map_err(|_| DeriveError::TemplateNotFound(manifest_name.to_string()))?;
    let mut manifest: Value = serde_json::from_slice(&tmpl_bytes)
        .map_err(|e| DeriveError::IOError(format!("error parsing manifest: {e}")))?;

    let manifest_obj = manifest
        .as_object_mut()
        .ok_or_else(|| DeriveError::IOError("manifest template is not a JSON object".to_string()))?;

    let assertions = manifest_obj
        .remove("assertions")
        .ok_or_else(|| DeriveError::IOError("'assertions' not in manifest template".to_string()))?;
    let assertions = replace_vars(ctx, source_cid, assertions).await?;
    manifest_obj.insert("assertions".to_string(), assertions);

    if let Some(credentials) = manifest_obj.remove("credentials") {
        let credentials = replace_vars(ctx, source_cid, credentials).await?;
        manifest_obj.insert("credentials".to_string(), credentials);
    }

    let manifest_json = serde_json::to_string(&manifest)
        .map_err(|e| DeriveError::IOError(format!("error encoding replaced manifest JSON: {e}")))?;

    // File extension is required by the tool, so sniff the source first.
    let media_type = custody_cid::media::sniff_file(&source_path)?;
    let extension = extension_for_media_type(&media_type).ok_or_else(|| {
        DeriveError::IOError(format!(
            "detected file type {media_type} not supported for provenance injection"
        ))
    })?;

    let tmp_out = ctx
        .temp_dir
        .join(format!("inject_c2pa-{}.{extension}", uuid::Uuid::new_v4()));
    let source_symlink = ctx.temp_dir.join(format!("{source_cid}.{extension}"));
    let _ = std::fs::remove_file(&source_symlink);
    symlink(&source_path, &source_symlink)?;

    let run_result = run_tool(ctx, &source_symlink, &manifest_json, &tmp_out).await;
    let _ = std::fs::remove_file(&source_symlink);
    run_result?;

    let cleanup_tmp_out = || {
        let _ = std::fs::remove_file(&tmp_out);
    };

    let hashes = match custody_cid::compute_file_cid(&tmp_out) {
        Ok(h) => h,
        Err(e) => {
            cleanup_tmp_out();
            return Err(e.into());
        }
    };

    if let Err(e) = record_export(ctx, source_cid, manifest_name, &hashes.cid).await {
        cleanup_tmp_out();
        return Err(e);
    }

    let tmp_file = tempfile_from_path(tmp_out)?;
    move_into_files_dir(tmp_file, &ctx.files_dir, &hashes.cid)?;

    Ok(hashes.cid)
}

async fn record_export(
    ctx: &DeriveContext,
    source_cid: &str,
    manifest_name: &str,
    output_cid: &str,
) -> Result<(), DeriveError> {
    let export = serde_json::json!({
        "manifest": manifest_name,
        "cid": output_cid,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    ctx.attest
        .append_attribute(source_cid, "c2pa_exports", &export, None)
        .await?;
    ctx.attest
        .add_relationship(
            source_cid,
            &Relationship {
                side: RelationSide::Children,
                relation_type: "derived".to_string(),
                cid: output_cid.to_string(),
            },
        )
        .await?;
    Ok(())
}

async fn run_tool(
    ctx: &DeriveContext,
    source_symlink: &Path,
    manifest_json: &str,
    tmp_out: &Path,
) -> Result<(), DeriveError> {
    let output = tokio::process::Command::new(&ctx.c2pa_tool_path)
        .arg(source_symlink)
        .arg("--config")
        .arg(manifest_json)
        .arg("--output")
        .arg(tmp_out)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DeriveError::ToolUnavailable(ctx.c2pa_tool_path.display().to_string())
            } else {
                DeriveError::IOError(e.to_string())
            }
        })?;

    if !output.status.success() {
        log::warn!(
            "provenance injection tool output: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        return Err(DeriveError::ToolFailed(
            ctx.c2pa_tool_path.display().to_string(),
            output.status.code().unwrap_or(-1),
        ));
    }

    Ok(())
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(not(unix))]
fn symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    std::fs::copy(original, link).map(|_| ())
}

fn tempfile_from_path(path: PathBuf) -> std::io::Result<tempfile::NamedTempFile> {
    let file = std::fs::File::open(&path)?;
    Ok(tempfile::NamedTempFile::from_parts(
        file,
        tempfile::TempPath::from_path(path),
    ))
}
