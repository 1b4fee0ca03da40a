use std::path::Path;

/// The path of `file`, relative to `sync_root`, forward-slash separated.
/// `None` if `file` doesn't actually live under `sync_root`.
pub fn relative_to_root(sync_root: &Path, file: &Path) -> Option<String> {
    let rel: &Path = file.strip_prefix(sync_root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        parts.push(component.as_os_str().to_string_lossy().to_string());
    }
    Some(parts.join("/"))
}

pub fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sync_root_and_joins_with_slashes() {
        let root = Path::new("/srv/sync");
        let file = Path::new("/srv/sync/alice/sub/clip.mp4");
        assert_eq!(relative_to_root(root, file).as_deref(), Some("alice/sub/clip.mp4"));
    }

    #[test]
    fn outside_sync_root_is_none() {
        let root = Path::new("/srv/sync");
        let file = Path::new("/tmp/other/clip.mp4");
        assert_eq!(relative_to_root(root, file), None);
    }
}
