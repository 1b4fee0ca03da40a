//! Content-addressed blob storage, keyed by the CIDs minted in `custody-cid`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use custody_cid::cid::cid_for_bytes;

/// Local filesystem blob storage.
pub mod local_fs;
/// In-memory blob storage, for tests.
pub mod in_memory;

pub use in_memory::InMemoryStore;
pub use local_fs::LocalFs;

/// Trait for content-addressable blob storage backends.
///
/// Stores binary data indexed by CID. All data is content-addressed using
/// the CIDv1/SHA2-256 scheme in `custody-cid`.
#[async_trait]
pub trait BlobStore {
    /// Initialize the store (e.g. create its root directory).
    async fn init(&mut self) -> Result<()>;

    /// Check if a CID exists in the store.
    async fn exists(&self, cid: &str) -> Result<bool>;

    /// Get a blob from the store.
    async fn get(&self, cid: &str) -> Result<Option<Vec<u8>>>;

    /// Put a blob into the store, returning its CID.
    ///
    /// If `cid` is provided, it is compared against the computed CID and an
    /// error is returned on mismatch.
    async fn put(&self, blob: Vec<u8>, cid: Option<&str>) -> Result<String>;
}

fn calc_and_validate_cid(blob: &[u8], expected_cid: Option<&str>) -> Result<String> {
    let computed_cid = cid_for_bytes(blob)?;

    if let Some(cid) = expected_cid {
        if cid != computed_cid {
            return Err(anyhow!(
                "computed CID '{computed_cid}' doesn't match provided CID '{cid}'"
            ));
        }
    }

    Ok(computed_cid)
}
