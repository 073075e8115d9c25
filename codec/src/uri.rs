//! Buffer and image URI resolution

use base64::{Engine, engine::general_purpose::STANDARD};
use std::path::{Path, PathBuf};

use crate::error::{CodecError, Result};

/// A parsed glTF URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Uri {
    /// `data:` URI with optional MIME type and decoded payload
    Data {
        mime_type: Option<String>,
        data: Vec<u8>,
    },
    /// Path relative to the document
    Relative(PathBuf),
}

impl Uri {
    pub fn parse(uri: &str) -> Result<Self> {
        if let Some(rest) = strip_prefix_ignore_case(uri, "data:") {
            let Some((params, payload)) = rest.split_once(',') else {
                return Err(bad_uri(uri, "missing ',' in data URI"));
            };
            let (mime, base64) = match params.strip_suffix(";base64") {
                Some(mime) => (mime, true),
                None => (params, false),
            };
            let data = if base64 {
                STANDARD
                    .decode(payload)
                    .map_err(|e| bad_uri(uri, &e.to_string()))?
            } else {
                percent_decode(payload)
            };
            let mime_type = (!mime.is_empty()).then(|| mime.to_string());
            return Ok(Uri::Data { mime_type, data });
        }

        if let Some(path) = strip_prefix_ignore_case(uri, "file://") {
            return Ok(Uri::Relative(PathBuf::from(decode_path(uri, path)?)));
        }

        if uri.contains("://") {
            return Err(bad_uri(uri, "unsupported scheme"));
        }

        Ok(Uri::Relative(PathBuf::from(decode_path(uri, uri)?)))
    }

    /// Load the bytes the URI points to
    pub fn load(&self, base: Option<&Path>) -> Result<Vec<u8>> {
        match self {
            Uri::Data { data, .. } => Ok(data.clone()),
            Uri::Relative(path) => {
                let full = match base {
                    Some(base) if path.is_relative() => base.join(path),
                    _ => path.clone(),
                };
                tracing::debug!("Loading external resource {:?}", full);
                Ok(std::fs::read(full)?)
            }
        }
    }
}

/// Encode bytes as a base64 `data:` URI
pub fn encode_data_uri(mime_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if text.len() >= prefix.len() && text[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

fn bad_uri(uri: &str, reason: &str) -> CodecError {
    // Keep error messages readable for multi-megabyte data URIs
    let shown: String = uri.chars().take(64).collect();
    CodecError::BadUri {
        uri: shown,
        reason: reason.to_string(),
    }
}

fn decode_path(uri: &str, path: &str) -> Result<String> {
    String::from_utf8(percent_decode(path)).map_err(|_| bad_uri(uri, "path is not valid UTF-8"))
}

fn percent_decode(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_data_uri() {
        let uri = Uri::parse("data:application/octet-stream;base64,AQIDBA==").unwrap();
        assert_eq!(
            uri,
            Uri::Data {
                mime_type: Some("application/octet-stream".to_string()),
                data: vec![1, 2, 3, 4],
            }
        );
    }

    #[test]
    fn test_encode_then_parse() {
        let uri = encode_data_uri("image/png", &[0x89, b'P', b'N', b'G']);
        match Uri::parse(&uri).unwrap() {
            Uri::Data { mime_type, data } => {
                assert_eq!(mime_type.as_deref(), Some("image/png"));
                assert_eq!(data, vec![0x89, b'P', b'N', b'G']);
            }
            other => panic!("expected data URI, got {:?}", other),
        }
    }

    #[test]
    fn test_relative_path_percent_decoded() {
        let uri = Uri::parse("textures/my%20file.png").unwrap();
        assert_eq!(uri, Uri::Relative(PathBuf::from("textures/my file.png")));
    }

    #[test]
    fn test_rejects_remote_scheme() {
        assert!(matches!(
            Uri::parse("https://example.com/a.bin"),
            Err(CodecError::BadUri { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_base64() {
        assert!(Uri::parse("data:application/octet-stream;base64,@@@").is_err());
    }

    #[test]
    fn test_load_relative_from_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.bin"), [7u8, 8, 9]).unwrap();
        let uri = Uri::parse("data.bin").unwrap();
        assert_eq!(uri.load(Some(dir.path())).unwrap(), vec![7, 8, 9]);
    }
}
