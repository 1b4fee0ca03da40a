use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::project::Project;

/// Which format a discovered file was classified as: a `.zip` is probed
/// for the ProofMode sentinel, then for a `.wacz` name, before falling
/// back to the generic class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    Generic,
    PgpBundle,
    Wacz,
}

/// Classifies `path` from the magic bytes of its first 512 bytes: only
/// files detected as `application/zip` are probed further for a
/// ProofMode or WACZ shape.
pub fn detect_class(path: &Path) -> Result<FileClass> {
    let media_type = custody_cid::media::sniff_file(path)?;

    if media_type == "application/zip" {
        if custody_verify_pgp::is_proofmode_file(path) {
            return Ok(FileClass::PgpBundle);
        }
        if custody_verify_wacz::is_wacz_file(path) {
            return Ok(FileClass::Wacz);
        }
    }

    Ok(FileClass::Generic)
}

/// Builds the generic-class metadata map.
pub fn generic_metadata(path: &Path, media_type: &str) -> Result<Map<String, Value>> {
    let meta = std::fs::metadata(path)?;
    let modified: DateTime<Utc> = meta.modified()?.into();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut map = Map::new();
    map.insert("media_type".to_string(), Value::String(media_type.to_string()));
    map.insert("asset_origin_id".to_string(), Value::String(file_name.clone()));
    map.insert("asset_origin_type".to_string(), Value::Array(vec![Value::String("folder".to_string())]));
    map.insert("file_name".to_string(), Value::String(file_name));
    map.insert("last_modified".to_string(), Value::String(modified.to_rfc3339()));
    map.insert("time_created".to_string(), Value::String(modified.to_rfc3339()));
    Ok(map)
}

/// Attaches `project_id`, a cleaned `project_path`, and an
/// `author:{@type,name,identifier}` object to a metadata map.
/// `relative_path` is the file's path relative to the sync root,
/// forward-slash separated.
pub fn attach_project_fields(map: &mut Map<String, Value>, project: &Project, relative_path: &str) {
    map.insert("project_id".to_string(), Value::String(project.project_id.clone()));
    map.insert(
        "project_path".to_string(),
        Value::String(clean_project_path(relative_path)),
    );
    if let Some(author) = project.author_object() {
        map.insert("author".to_string(), author);
    }
}

fn clean_project_path(relative_path: &str) -> String {
    relative_path.trim_matches('/').replace('\\', "/")
}

/// Files whose name begins with `.` or ends in `.partial` are skipped, as
/// are files whose extension isn't in a project's non-empty
/// `fileExtensions` allow-list.
pub fn should_include_file(file_name: &str, project: Option<&Project>) -> bool {
    if file_name.starts_with('.') {
        return false;
    }
    if file_name.ends_with(".partial") {
        return false;
    }
    match project {
        Some(project) => project.should_include_extension(file_name),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_dotfiles_and_partials() {
        assert!(!should_include_file(".hidden", None));
        assert!(!should_include_file("video.mp4.partial", None));
        assert!(should_include_file("video.mp4", None));
    }

    #[test]
    fn clean_project_path_strips_slashes() {
        assert_eq!(clean_project_path("/alice/sub/"), "alice/sub");
        assert_eq!(clean_project_path(""), "");
    }
}
