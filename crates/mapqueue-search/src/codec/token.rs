//! URL-safe envelope: deflate, then unpadded base64url.

use std::io::{Read, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use super::CodecError;

/// Upper bound on the inflated payload. Real queries are a few hundred bytes.
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

pub fn pack(bytes: &[u8]) -> Result<String, CodecError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(bytes)
        .map_err(|e| CodecError::Compression(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| CodecError::Compression(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(compressed))
}

pub fn unpack(token: &str) -> Result<Vec<u8>, CodecError> {
    let trimmed = token.trim().trim_end_matches('=');
    let compressed = URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))?;

    let mut out = Vec::new();
    DeflateDecoder::new(compressed.as_slice())
        .take(MAX_PAYLOAD_BYTES as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Compression(e.to_string()))?;
    if out.len() > MAX_PAYLOAD_BYTES {
        return Err(CodecError::Compression(format!(
            "payload exceeds {MAX_PAYLOAD_BYTES} bytes"
        )));
    }
    Ok(out)
}
