use std::io::Read;

use anyhow::Result;
use flate2::read::MultiGzDecoder;

/// Scans a (possibly gzip-compressed, possibly multi-member) WARC file for
/// the first `WARC-Header`'s `User-Agent:` line, used to attribute a
/// browser-based crawl. Best-effort: returns `None` rather than erroring
/// when no such line is found.
pub fn find_user_agent(warc_bytes: &[u8]) -> Option<String> {
    let text = decompress_best_effort(warc_bytes);
    find_user_agent_in_text(&text)
}

fn decompress_best_effort(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0x1f, 0x8b]) {
        let mut decoder = MultiGzDecoder::new(bytes);
        let mut out = Vec::new();
        if decoder.read_to_end(&mut out).is_ok() {
            return String::from_utf8_lossy(&out).into_owned();
        }
    }
    String::from_utf8_lossy(bytes).into_owned()
}

fn find_user_agent_in_text(text: &str) -> Option<String> {
    for line in text.lines() {
        let lower = line.to_ascii_lowercase();
        if let Some(idx) = lower.find("user-agent:") {
            let value = line[idx + "user-agent:".len()..].trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::{write::GzEncoder, Compression};

    use super::*;

    #[test]
    fn finds_user_agent_in_plain_text() {
        let warc = "WARC/1.0\r\nWARC-Type: request\r\nUser-Agent: Mozilla/5.0 (browsertrix-crawler)\r\n\r\n";
        assert_eq!(
            find_user_agent(warc.as_bytes()).as_deref(),
            Some("Mozilla/5.0 (browsertrix-crawler)")
        );
    }

    #[test]
    fn finds_user_agent_inside_gzip() {
        let warc = "WARC/1.0\r\nuser-agent: some-crawler/1.2\r\n\r\n";
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(warc.as_bytes()).unwrap();
        let gzipped = encoder.finish().unwrap();

        assert_eq!(find_user_agent(&gzipped).as_deref(), Some("some-crawler/1.2"));
    }

    #[test]
    fn returns_none_when_absent() {
        assert_eq!(find_user_agent(b"WARC/1.0\r\nWARC-Type: request\r\n\r\n"), None);
    }
}
