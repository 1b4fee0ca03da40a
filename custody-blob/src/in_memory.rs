use std::{collections::HashMap, sync::Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::{calc_and_validate_cid, BlobStore};

/// In-memory blob storage. Not persistent; used for testing.
#[derive(Default)]
pub struct InMemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    /// Pre-populates the store, e.g. so a test can seed blobs before the
    /// code under test calls `get`/`exists`.
    pub fn with_blob(self, cid: impl Into<String>, blob: Vec<u8>) -> Self {
        self.blobs.lock().unwrap().insert(cid.into(), blob);
        self
    }
}

#[async_trait]
impl BlobStore for InMemoryStore {
    async fn init(&mut self) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, cid: &str) -> Result<bool> {
        log::trace!("check exists {cid}.");
        Ok(self.blobs.lock().unwrap().contains_key(cid))
    }

    async fn get(&self, cid: &str) -> Result<Option<Vec<u8>>> {
        log::trace!("get {cid}.");
        Ok(self.blobs.lock().unwrap().get(cid).cloned())
    }

    async fn put(&self, blob: Vec<u8>, cid: Option<&str>) -> Result<String> {
        let computed_cid = calc_and_validate_cid(&blob, cid)?;
        self.blobs.lock().unwrap().insert(computed_cid.clone(), blob);
        Ok(computed_cid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_prepopulated_blob() {
        let store = InMemoryStore::default().with_blob("bcid", b"hi".to_vec());

        assert!(store.exists("bcid").await.unwrap());
        assert_eq!(store.get("bcid").await.unwrap(), Some(b"hi".to_vec()));
        assert_eq!(store.get("bmissing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_stores_under_computed_cid_and_rejects_mismatch() {
        let store = InMemoryStore::default();
        let cid = store.put(b"hello".to_vec(), None).await.unwrap();
        assert_eq!(store.get(&cid).await.unwrap(), Some(b"hello".to_vec()));

        assert!(store.put(b"hello".to_vec(), Some("not-the-cid")).await.is_err());
    }
}
