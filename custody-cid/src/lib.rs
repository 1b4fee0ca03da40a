//! Content identifier computation: CIDv1 (raw codec, SHA2-256 multihash,
//! lowercase base32 multibase) plus the multi-algorithm tee-hash used
//! throughout ingest and verification.

/// Multicodec and multihash constant tables, and `urn:cid:`/`urn:uuid:` helpers.
pub mod cid;
/// Streaming tee-hash engine (CID + sha256 + md5 + blake3 + size).
pub mod hash;
/// Best-effort media type sniffing from a file's leading bytes.
pub mod media;
/// Recursive directory walking for folder ingest, matching `.cidignore`/`.gitignore` rules.
pub mod walk;

pub use cid::{cid_for_bytes, compute_file_cid, FileHashes};
