//! Strict Base64URL codec (§4.1).
//!
//! Unpadded on encode. Decode enforces the Base64URL alphabet and a
//! round-trip re-encode check: the decoded bytes, re-encoded, must
//! byte-equal the input. This rejects forgiving-decoder canonicalisation
//! variants where two distinct strings would map to the same bytes.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as B64URL, Engine as _};

use crate::error::{err, ErrorKind, SdlpError};

/// Encode bytes as unpadded Base64URL.
pub fn encode(bytes: &[u8]) -> String {
    B64URL.encode(bytes)
}

/// Decode a Base64URL string, rejecting anything outside the alphabet and
/// any input that doesn't round-trip.
pub fn decode(s: &str) -> Result<Vec<u8>, SdlpError> {
    if !s.bytes().all(is_b64url_byte) {
        return Err(err(ErrorKind::InvalidStructure)
            .with_context("reason", "invalid base64url alphabet"));
    }
    let bytes = B64URL
        .decode(s.as_bytes())
        .map_err(|e| err(ErrorKind::InvalidStructure).with_context("reason", e.to_string()))?;
    if encode(&bytes) != s {
        return Err(err(ErrorKind::InvalidStructure)
            .with_context("reason", "base64url value does not round-trip"));
    }
    Ok(bytes)
}

fn is_b64url_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}
