//! Chunked, authenticated symmetric encryption for derived artifact copies.
//!
//! Uses the `crypto_secretstream_xchacha20poly1305` construction (a header
//! plus a sequence of authenticated chunks, each tagged `Message` or
//! `Final`), the same primitive the system this was distilled from reaches
//! for via a libsodium secretstream binding. `dryoc` is a pure-Rust
//! reimplementation of the same construction.

use std::io::{Read, Write};

use anyhow::{anyhow, bail, Result};
use dryoc::secretstream::{Header, Key, PullStream, PushStream, Tag};

/// Plaintext is chunked into blocks of this size before each is pushed
/// through the stream.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// Generates a fresh random 32-byte stream key.
pub fn generate_key() -> Key {
    Key::gen()
}

/// Encrypts `plaintext_size` bytes read from `input`, writing the stream
/// header followed by a sequence of authenticated chunks to `output`.
///
/// The final chunk is tagged `Final` by tracking bytes read against the
/// caller-supplied `plaintext_size`, rather than by waiting for a
/// zero-length read — this lets the final tag attach correctly even when
/// the last chunk happens to be empty.
pub fn encrypt_stream(
    mut input: impl Read,
    mut output: impl Write,
    plaintext_size: u64,
    key: &Key,
) -> Result<()> {
    let (mut push_state, header) =
        PushStream::init(key).map_err(|e| anyhow!("failed to initialize encryption stream: {e:?}"))?;

    output.write_all(header.as_slice())?;

    let mut bytes_read: u64 = 0;
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = input.read(&mut buf)?;
        bytes_read += n as u64;

        let is_final = bytes_read >= plaintext_size;
        let tag = if is_final { Tag::Final } else { Tag::Message };

        let ciphertext = push_state
            .push(&buf[..n], None, tag)
            .map_err(|e| anyhow!("failed to encrypt chunk: {e:?}"))?;
        output.write_all(&ciphertext)?;

        if is_final {
            break;
        }
    }

    Ok(())
}

/// Decrypts a stream produced by [`encrypt_stream`].
///
/// Unlike the encrypt side, this doesn't need a byte-count pre-check for
/// end-of-file: `dryoc`'s `pull` authenticates and returns each chunk's tag
/// directly, so the last chunk is unambiguous without tracking a size
/// counter against the source file's length. Fails if the stream ends
/// without a `Final`-tagged chunk, or if a `Final` tag arrives and further
/// ciphertext still follows it.
pub fn decrypt_stream(mut input: impl Read, mut output: impl Write, key: &Key) -> Result<()> {
    let mut header_bytes = [0u8; Header::HEADER_BYTES];
    input.read_exact(&mut header_bytes)?;
    let header = Header::from(header_bytes);

    let mut pull_state =
        PullStream::init(&header, key).map_err(|e| anyhow!("failed to initialize decryption stream: {e:?}"))?;

    let mut buf = vec![0u8; CHUNK_SIZE + dryoc::constants::CRYPTO_SECRETSTREAM_XCHACHA20POLY1305_ABYTES];
    let mut saw_final = false;

    loop {
        let n = input.read(&mut buf)?;
        if n == 0 {
            break;
        }
        if saw_final {
            bail!("encrypted stream continued after its final chunk");
        }

        let (plaintext, tag) = pull_state
            .pull(&buf[..n], None)
            .map_err(|e| anyhow!("failed to decrypt chunk: {e:?}"))?;

        output.write_all(&plaintext)?;

        if tag == Tag::Final {
            saw_final = true;
        }
    }

    if !saw_final {
        bail!("file ended early, encrypted stream truncated");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn roundtrips_a_multi_chunk_stream() {
        let key = generate_key();
        let plaintext = vec![0x42u8; CHUNK_SIZE * 2 + 17];

        let mut ciphertext = Vec::new();
        encrypt_stream(
            Cursor::new(&plaintext),
            &mut ciphertext,
            plaintext.len() as u64,
            &key,
        )
        .unwrap();

        let mut decrypted = Vec::new();
        decrypt_stream(Cursor::new(&ciphertext), &mut decrypted, &key).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn roundtrips_an_empty_file() {
        let key = generate_key();
        let plaintext: Vec<u8> = vec![];

        let mut ciphertext = Vec::new();
        encrypt_stream(Cursor::new(&plaintext), &mut ciphertext, 0, &key).unwrap();

        let mut decrypted = Vec::new();
        decrypt_stream(Cursor::new(&ciphertext), &mut decrypted, &key).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn rejects_truncated_ciphertext() {
        let key = generate_key();
        let plaintext = vec![0x7u8; CHUNK_SIZE + 5];

        let mut ciphertext = Vec::new();
        encrypt_stream(
            Cursor::new(&plaintext),
            &mut ciphertext,
            plaintext.len() as u64,
            &key,
        )
        .unwrap();

        let truncated = &ciphertext[..ciphertext.len() - 10];

        let mut decrypted = Vec::new();
        let err = decrypt_stream(Cursor::new(truncated), &mut decrypted, &key).unwrap_err();

        assert!(err.to_string().contains("truncated") || err.to_string().contains("decrypt"));
    }
}
