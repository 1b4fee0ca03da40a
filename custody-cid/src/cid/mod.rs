use std::{
    fs::File,
    io::Read,
    path::Path,
    str::FromStr,
};

use ::cid::{multihash::MultihashGeneric, Cid};
use anyhow::Result;
use md5::{Digest as Md5Digest, Md5};
use sha2::{Digest as Sha2Digest, Sha256};

/// Multicodec identifiers used by this system.
pub mod multicodec {
    /// Raw binary data. Every CID minted here uses this codec.
    pub const RAW_BINARY: u64 = 0x55;
}

/// Multihash identifiers used by this system.
pub mod multihash {
    /// SHA2-256 hash, the only multihash this system mints.
    pub const SHA2_256: u64 = 0x12;
}

type Multihash = MultihashGeneric<64>;

/// Tee-computed hashes of a single stream of bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHashes {
    pub cid: String,
    pub sha256: String,
    pub md5: String,
    pub blake3: String,
    pub file_size: u64,
}

/// Strips the `urn:cid:` prefix from a CID string, if present.
pub fn strip_urn_cid(cid: &str) -> &str {
    cid.strip_prefix("urn:cid:").unwrap_or(cid)
}

/// Strips the `urn:uuid:` prefix from a UUID string, if present.
pub fn strip_urn_uuid(uuid: &str) -> &str {
    uuid.strip_prefix("urn:uuid:").unwrap_or(uuid)
}

/// Prepends `urn:cid:` to a CID string if not already present.
///
/// # Panics
/// Panics if `cid` is empty.
pub fn prepend_urn_cid(cid: &str) -> String {
    assert!(!cid.is_empty(), "attempted to prepend 'urn:cid:' to an empty string");

    if cid.starts_with("urn:cid:") {
        cid.to_string()
    } else {
        format!("urn:cid:{cid}")
    }
}

/// Prepends `urn:uuid:` to a UUID string if not already present.
///
/// # Panics
/// Panics if `uuid` is empty.
pub fn prepend_urn_uuid(uuid: &str) -> String {
    assert!(!uuid.is_empty(), "attempted to prepend 'urn:uuid:' to an empty string");

    if uuid.starts_with("urn:uuid:") {
        uuid.to_string()
    } else {
        format!("urn:uuid:{uuid}")
    }
}

/// Extracts the multicodec identifier from a CID string.
pub fn get_multicodec(cid: &str) -> Result<u64> {
    let cid = Cid::from_str(cid)?;
    Ok(cid.codec())
}

/// Mints a CIDv1, raw codec, SHA2-256 multihash string for the given bytes.
pub fn cid_for_bytes(bytes: &[u8]) -> Result<String> {
    let digest = Sha256::digest(bytes);
    cid_for_bytes_from_sha256(&digest)
}

/// Mints a CIDv1, raw codec, SHA2-256 multihash string from an already-computed digest.
pub fn cid_for_bytes_from_sha256(sha256_digest: &[u8]) -> Result<String> {
    let multihash = Multihash::wrap(multihash::SHA2_256, sha256_digest)?;
    Ok(Cid::new_v1(multicodec::RAW_BINARY, multihash).to_string())
}

/// One-shot tee-hash of an in-memory buffer, for parity testing against the streaming path.
pub fn compute_file_cid_bytes(bytes: &[u8]) -> Result<FileHashes> {
    let sha256_digest = Sha256::digest(bytes);
    let cid = cid_for_bytes_from_sha256(&sha256_digest)?;

    Ok(FileHashes {
        cid,
        sha256: hex::encode(sha256_digest),
        md5: hex::encode(Md5::digest(bytes)),
        blake3: blake3::hash(bytes).to_hex().to_string(),
        file_size: bytes.len() as u64,
    })
}

/// Streams a file through SHA-256 (for the CID and the `sha256` attribute),
/// MD5, and BLAKE3 in a single pass, and reports its size.
pub fn compute_file_cid(path: impl AsRef<Path>) -> Result<FileHashes> {
    let mut file = File::open(path.as_ref())?;

    let mut sha256 = Sha256::new();
    let mut md5 = Md5::new();
    let mut blake3 = blake3::Hasher::new();
    let mut file_size: u64 = 0;

    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        sha256.update(&buf[..n]);
        md5.update(&buf[..n]);
        blake3.update(&buf[..n]);
        file_size += n as u64;
    }

    let sha256_digest = sha256.finalize();
    let multihash = Multihash::wrap(multihash::SHA2_256, &sha256_digest)?;
    let cid = Cid::new_v1(multicodec::RAW_BINARY, multihash).to_string();

    Ok(FileHashes {
        cid,
        sha256: hex::encode(sha256_digest),
        md5: hex::encode(md5.finalize()),
        blake3: blake3.finalize().to_hex().to_string(),
        file_size,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn hello_vector() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();

        let hashes = compute_file_cid(f.path()).unwrap();

        assert_eq!(
            hashes.sha256,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
        assert_eq!(hashes.file_size, 6);
        assert!(hashes.cid.starts_with('b'));
    }

    #[test]
    fn urn_cid_roundtrip() {
        let cid = "bafkqabc";
        assert_eq!(strip_urn_cid(&prepend_urn_cid(cid)), cid);
        assert_eq!(prepend_urn_cid(cid), prepend_urn_cid(&prepend_urn_cid(cid)));
    }
}
