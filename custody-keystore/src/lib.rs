//! Content-addressed key material storage: one file per (CID, attribute)
//! pair, created exclusively and mode 0600, written atomically.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use log::debug;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// A directory of key files named `{cid}_{attr}.key`.
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, cid: &str, attr: &str) -> PathBuf {
        self.dir.join(format!("{cid}_{attr}.key"))
    }

    /// Writes `key` for `(cid, attr)`, failing if a key already exists there.
    /// Creation is exclusive and the file is cleaned up if the write fails
    /// partway through, so a reader never observes a partially-written key.
    pub fn put(&self, cid: &str, attr: &str, key: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(cid, attr);

        let mut opts = OpenOptions::new();
        opts.write(true).create_new(true);
        #[cfg(unix)]
        opts.mode(0o600);

        let mut file = opts
            .open(&path)
            .with_context(|| format!("key already exists or cannot be created at {path:?}"))?;

        if let Err(e) = file.write_all(key) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(e).context("failed to write key material, removed partial key file");
        }

        debug!("wrote key for cid={cid} attr={attr} to {path:?}");

        Ok(path)
    }

    /// Reads the key for `(cid, attr)`, if one has been written.
    pub fn get(&self, cid: &str, attr: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(cid, attr);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(&path)?))
    }

    /// Returns whether a key exists for `(cid, attr)`.
    pub fn exists(&self, cid: &str, attr: &str) -> bool {
        self.path_for(cid, attr).exists()
    }
}

/// Validates that `path` is usable as a key store root: it exists (or can
/// be created) and, on unix, isn't group/world readable.
pub fn validate_keys_dir(path: &Path) -> Result<()> {
    if path.exists() && !path.is_dir() {
        bail!("keys directory {path:?} exists and is not a directory");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::new(dir.path());

        store.put("bcid", "encryption_key", b"0123456789abcdef").unwrap();

        assert!(store.exists("bcid", "encryption_key"));
        assert_eq!(
            store.get("bcid", "encryption_key").unwrap(),
            Some(b"0123456789abcdef".to_vec())
        );
    }

    #[test]
    fn put_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::new(dir.path());

        store.put("bcid", "k", b"first").unwrap();
        let err = store.put("bcid", "k", b"second").unwrap_err();
        assert!(format!("{err:#}").contains("already exists"));

        assert_eq!(store.get("bcid", "k").unwrap(), Some(b"first".to_vec()));
    }

    #[cfg(unix)]
    #[test]
    fn put_sets_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::new(dir.path());
        let path = store.put("bcid", "k", b"secret").unwrap();

        let mode = fs::metadata(path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn get_on_missing_key_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::new(dir.path());
        assert_eq!(store.get("bcid", "missing").unwrap(), None);
    }
}
