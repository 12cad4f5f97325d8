//! The closed SDLP error taxonomy.
//!
//! Every public entry point (`create_link`, `verify_link`) returns
//! `Result<_, SdlpError>`; nothing unwinds across either boundary.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value as Json;
use time::OffsetDateTime;

/// The closed set of failure kinds a link can produce.
///
/// Each variant's `code()` is the stable, wire-stable discriminator;
/// the `Display` message is a human-readable template and is not a
/// versioned contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum ErrorKind {
    #[error("link is malformed")]
    InvalidStructure,
    #[error("signature verification failed")]
    SignatureVerificationFailed,
    #[error("no matching verification method for kid")]
    KeyNotFound,
    #[error("DID resolution failed")]
    DidResolutionFailed,
    #[error("kid does not match sid")]
    DidMismatch,
    #[error("payload decompression failed")]
    PayloadDecompressionFailed,
    #[error("payload integrity check failed")]
    PayloadIntegrityFailed,
    #[error("time bounds violated")]
    TimeBoundsViolated,
    #[error("replay detected")]
    ReplayDetected,
}

impl ErrorKind {
    /// The stable machine code, e.g. `E_INVALID_STRUCTURE`.
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidStructure => "E_INVALID_STRUCTURE",
            Self::SignatureVerificationFailed => "E_SIGNATURE_VERIFICATION_FAILED",
            Self::KeyNotFound => "E_KEY_NOT_FOUND",
            Self::DidResolutionFailed => "E_DID_RESOLUTION_FAILED",
            Self::DidMismatch => "E_DID_MISMATCH",
            Self::PayloadDecompressionFailed => "E_PAYLOAD_DECOMPRESSION_FAILED",
            Self::PayloadIntegrityFailed => "E_PAYLOAD_INTEGRITY_FAILED",
            Self::TimeBoundsViolated => "E_TIME_BOUNDS_VIOLATED",
            Self::ReplayDetected => "E_REPLAY_DETECTED",
        }
    }
}

/// A single SDLP failure: kind, stable code, message, capture time, and an
/// optional best-effort context map.
///
/// `context` never carries private key material (§7).
#[derive(Debug, Clone, Serialize)]
pub struct SdlpError {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub captured_at: OffsetDateTime,
    pub context: HashMap<String, Json>,
}

impl SdlpError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            code: kind.code(),
            message: kind.to_string(),
            captured_at: OffsetDateTime::now_utc(),
            context: HashMap::new(),
        }
    }

    /// Attach a context value. Chainable for call-site ergonomics.
    pub fn with_context(mut self, key: &str, value: impl Into<Json>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}

impl std::fmt::Display for SdlpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for SdlpError {}

/// Shorthand for constructing a bare error of a given kind.
pub fn err(kind: ErrorKind) -> SdlpError {
    SdlpError::new(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_stable() {
        assert_eq!(ErrorKind::InvalidStructure.code(), "E_INVALID_STRUCTURE");
        assert_eq!(ErrorKind::ReplayDetected.code(), "E_REPLAY_DETECTED");
    }

    #[test]
    fn context_round_trips_through_with_context() {
        let e = err(ErrorKind::TimeBoundsViolated)
            .with_context("expiration", 100)
            .with_context("now", 200);
        assert_eq!(e.context.get("expiration").unwrap(), &Json::from(100));
        assert_eq!(e.context.get("now").unwrap(), &Json::from(200));
        assert_eq!(e.code, "E_TIME_BOUNDS_VIOLATED");
    }

    #[test]
    fn no_key_material_field_exists() {
        // Structural guarantee: SdlpError has no field capable of holding
        // signing material; this test documents that invariant so a future
        // edit adding one would have to touch this assertion deliberately.
        let e = err(ErrorKind::KeyNotFound);
        let json = serde_json::to_value(&e).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(
            obj.keys().cloned().collect::<std::collections::BTreeSet<_>>(),
            ["kind", "code", "message", "captured_at", "context"]
                .into_iter()
                .map(String::from)
                .collect()
        );
    }
}
