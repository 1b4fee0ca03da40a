use std::{fs, path::PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, trace};

use crate::{calc_and_validate_cid, BlobStore};

/// Stores blobs as individual files named by CID under a root directory.
pub struct LocalFs {
    path: PathBuf,
}

impl LocalFs {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl BlobStore for LocalFs {
    async fn init(&mut self) -> Result<()> {
        fs::create_dir_all(&self.path)?;
        Ok(())
    }

    async fn exists(&self, cid: &str) -> Result<bool> {
        trace!("check exists {cid}.");
        Ok(self.path.join(cid).exists())
    }

    async fn get(&self, cid: &str) -> Result<Option<Vec<u8>>> {
        trace!("get {cid}.");

        let path = self.path.join(cid);
        if path.exists() {
            Ok(Some(fs::read(path)?))
        } else {
            Ok(None)
        }
    }

    async fn put(&self, blob: Vec<u8>, cid: Option<&str>) -> Result<String> {
        let cid = calc_and_validate_cid(&blob, cid)?;

        trace!("put {cid}. blob size: {}", blob.len());

        let path = self.path.join(&cid);
        if path.exists() {
            debug!("blob with cid {cid} already exists.");
        } else {
            fs::write(path, &blob)?;
        }

        Ok(cid)
    }
}

#[cfg(test)]
mod test_local_fs {
    use super::*;

    #[tokio::test]
    async fn put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalFs::new(dir.path().to_path_buf());
        store.init().await.unwrap();

        let cid = store.put(b"hello\n".to_vec(), None).await.unwrap();
        assert!(store.exists(&cid).await.unwrap());
        assert_eq!(store.get(&cid).await.unwrap(), Some(b"hello\n".to_vec()));
    }

    #[tokio::test]
    async fn put_rejects_cid_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalFs::new(dir.path().to_path_buf());
        store.init().await.unwrap();

        let err = store
            .put(b"hello\n".to_vec(), Some("bnotarealcid"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("doesn't match"));
    }
}
