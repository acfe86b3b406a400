//! Image inputs accepted by the upload endpoints.
//!
//! Captures reach the workflow in whatever form the host produced them: raw
//! bytes, base64 text (possibly a `data:` URL), a stream, or a file on disk.
//! Everything is resolved to bytes before a request is built.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use crate::error::ClientError;

pub enum ImageInput {
    Bytes(Vec<u8>),
    /// Base64 text, optionally prefixed with `data:<mime>;base64,`.
    Base64(String),
    Reader(Box<dyn Read + Send>),
    Path(PathBuf),
    /// Text of unknown kind: tried as base64 first, then as a file path.
    Text(String),
}

impl fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Self::Base64(s) => write!(f, "Base64({} chars)", s.len()),
            Self::Reader(_) => f.write_str("Reader"),
            Self::Path(p) => write!(f, "Path({})", p.display()),
            Self::Text(s) => write!(f, "Text({} chars)", s.len()),
        }
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl ImageInput {
    /// Resolve to the bytes that will be uploaded.
    ///
    /// Fails with [`ClientError::Decoding`] when the input cannot be read or
    /// decoded, or when it resolves to zero bytes.
    pub fn into_bytes(self) -> Result<Vec<u8>, ClientError> {
        let bytes = match self {
            Self::Bytes(b) => b,
            Self::Base64(s) => decode_base64(&s)
                .map_err(|e| ClientError::Decoding(format!("invalid base64: {e}")))?,
            Self::Reader(mut r) => {
                let mut buf = Vec::new();
                r.read_to_end(&mut buf)
                    .map_err(|e| ClientError::Decoding(format!("reading image stream: {e}")))?;
                buf
            }
            Self::Path(p) => std::fs::read(&p).map_err(|e| {
                ClientError::Decoding(format!("reading {}: {e}", p.display()))
            })?,
            Self::Text(s) => match decode_base64(&s) {
                Ok(b) => b,
                Err(_) => std::fs::read(s.trim()).map_err(|_| {
                    ClientError::Decoding(
                        "text is neither valid base64 nor a readable file path".into(),
                    )
                })?,
            },
        };

        if bytes.is_empty() {
            return Err(ClientError::Decoding("image is empty".into()));
        }
        debug!(bytes = bytes.len(), "image input resolved");
        Ok(bytes)
    }
}

/// Strip a `data:...;base64,` prefix and decode strictly.
pub fn decode_base64(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(strip_data_url(s.trim()))
}

fn strip_data_url(s: &str) -> &str {
    if s.starts_with("data:")
        && let Some(idx) = s.find(";base64,")
    {
        return &s[idx + ";base64,".len()..];
    }
    s
}
