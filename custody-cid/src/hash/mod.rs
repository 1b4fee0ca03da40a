use anyhow::Result;
use md5::{Digest as Md5Digest, Md5};
use sha2::{Digest as Sha2Digest, Sha256};

use crate::cid::FileHashes;

/// Incrementally tees bytes into SHA-256, MD5, and BLAKE3. Used by callers
/// (such as the PGP-bundle verifier) that must hash a stream while also
/// performing other work, like signature verification, over the same bytes.
pub struct TeeHasher {
    sha256: Sha256,
    md5: Md5,
    blake3: blake3::Hasher,
    len: u64,
}

impl Default for TeeHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl TeeHasher {
    pub fn new() -> Self {
        Self {
            sha256: Sha256::new(),
            md5: Md5::new(),
            blake3: blake3::Hasher::new(),
            len: 0,
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.sha256.update(chunk);
        self.md5.update(chunk);
        self.blake3.update(chunk);
        self.len += chunk.len() as u64;
    }

    /// Finalizes into `FileHashes`, minting the CID from the SHA-256 digest.
    pub fn finish(self) -> Result<FileHashes> {
        let sha256_digest = self.sha256.finalize();
        let cid = crate::cid::cid_for_bytes_from_sha256(&sha256_digest)?;

        Ok(FileHashes {
            cid,
            sha256: hex::encode(sha256_digest),
            md5: hex::encode(self.md5.finalize()),
            blake3: self.blake3.finalize().to_hex().to_string(),
            file_size: self.len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_one_shot_hashing() {
        let mut tee = TeeHasher::new();
        tee.update(b"hello\n");
        let streamed = tee.finish().unwrap();

        let whole = crate::cid::compute_file_cid_bytes(b"hello\n").unwrap();

        assert_eq!(streamed, whole);
    }
}
