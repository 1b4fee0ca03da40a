use std::{fs::File, io::Read, path::Path};

use anyhow::Result;

/// Best-effort media type sniff from a file's leading bytes, falling back to
/// `application/octet-stream` when nothing matches. Mirrors the behavior of
/// reading the first 512 bytes of a file and classifying by magic number.
pub fn sniff_file(path: impl AsRef<Path>) -> Result<String> {
    let mut file = File::open(path)?;
    let mut head = [0u8; 512];
    let n = file.read(&mut head)?;

    Ok(sniff_bytes(&head[..n]))
}

/// Same as [`sniff_file`] but over an in-memory buffer.
///
/// `infer` only classifies by binary magic number and returns `None` for
/// plain text, so a text fallback is checked before giving up to
/// `application/octet-stream`, matching `http.DetectContentType`'s text
/// branch.
pub fn sniff_bytes(bytes: &[u8]) -> String {
    if let Some(t) = infer::get(bytes) {
        return t.mime_type().to_string();
    }
    if looks_like_text(bytes) {
        return "text/plain; charset=utf-8".to_string();
    }
    "application/octet-stream".to_string()
}

/// Bytes decode as UTF-8 and carry none of the control bytes that mark
/// binary data, allowing the common whitespace controls (tab, LF, FF, CR).
fn looks_like_text(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let Ok(text) = std::str::from_utf8(bytes) else {
        return false;
    };
    !text
        .chars()
        .any(|c| c == '\u{FFFD}' || (c < ' ' && !matches!(c, '\t' | '\n' | '\u{0C}' | '\r')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_bytes_fall_back() {
        assert_eq!(sniff_bytes(&[0x00, 0x01, 0x02, 0xff]), "application/octet-stream");
    }

    #[test]
    fn png_header_detected() {
        let png_header = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(sniff_bytes(&png_header), "image/png");
    }

    #[test]
    fn plain_text_detected_as_utf8_text() {
        assert_eq!(sniff_bytes(b"hello\n"), "text/plain; charset=utf-8");
    }

    #[test]
    fn invalid_utf8_falls_back_to_octet_stream() {
        assert_eq!(sniff_bytes(&[0xff, 0xfe, 0xfd]), "application/octet-stream");
    }
}
