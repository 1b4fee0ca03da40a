use std::path::{Path, PathBuf};

use anyhow::Result;

/// Controls which files a recursive directory scan visits, mirroring a
/// `.gitignore`-like filter stack.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WalkConfig {
    #[serde(default)]
    pub include_hidden_files: bool,
    #[serde(default)]
    pub gitignore: bool,
    #[serde(default)]
    pub include_symlinks: bool,
}

/// Recursively lists files under `root`, honoring `.gitignore`/`.cidignore`
/// per `config`, sorted by path for a deterministic traversal order.
pub fn walk_dir(root: impl AsRef<Path>, config: &WalkConfig) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();

    let mut wb = ignore::WalkBuilder::new(root);
    wb.standard_filters(false);
    wb.parents(true);
    wb.hidden(!config.include_hidden_files);
    wb.git_ignore(config.gitignore);
    wb.add_custom_ignore_filename(".cidignore");
    wb.follow_links(config.include_symlinks);

    let mut files = wb
        .build()
        .map(|entry| entry.map_err(|e| anyhow::anyhow!(e)))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .filter(|entry| {
            let path = entry.path();
            path.is_file() && (config.include_symlinks || !path.is_symlink())
        })
        .map(|entry| entry.path().to_path_buf())
        .collect::<Vec<_>>();

    files.sort();

    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn walks_and_sorts_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), b"b").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/a.txt"), b"a").unwrap();

        let files = walk_dir(dir.path(), &WalkConfig::default()).unwrap();

        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("b.txt") || files[0].ends_with("sub/a.txt"));
    }

    #[test]
    fn excludes_hidden_files_by_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".hidden"), b"x").unwrap();
        fs::write(dir.path().join("visible.txt"), b"x").unwrap();

        let files = walk_dir(dir.path(), &WalkConfig::default()).unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("visible.txt"));
    }
}
