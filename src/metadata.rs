//! Signed envelope records: the JWS protected header and the core
//! metadata payload (§3, §4.5).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::compression::CompressionTag;
use crate::error::{err, ErrorKind, SdlpError};

/// The protocol version this crate produces and accepts.
pub const PROTOCOL_VERSION: &str = "SDL-1.0";

/// `did:<method>:<method-specific-id>#<fragment>`.
static DID_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^did:[a-z0-9]+:[A-Za-z0-9._-]+#[A-Za-z0-9._-]+$").unwrap());

/// Validate a DID URL (a `kid`) against the shape in §3.
pub fn validate_did_url(kid: &str) -> Result<(), SdlpError> {
    if DID_URL_RE.is_match(kid) {
        Ok(())
    } else {
        Err(err(ErrorKind::InvalidStructure)
            .with_context("reason", "kid is not a valid DID URL")
            .with_context("kid", kid.to_string()))
    }
}

/// The base DID of a DID URL (everything before `#`).
pub fn did_base(kid: &str) -> &str {
    kid.split('#').next().unwrap_or(kid)
}

/// The JWS protected header (signed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedHeader {
    pub alg: String,
    pub kid: String,
    /// Unrecognized fields are tolerated (forward compatible) but never
    /// used for dispatch.
    #[serde(flatten, default)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ProtectedHeader {
    pub fn new(kid: impl Into<String>) -> Self {
        Self {
            alg: "EdDSA".to_string(),
            kid: kid.into(),
            extra: HashMap::new(),
        }
    }
}

/// The core metadata (the JWS payload, signed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreMetadata {
    pub v: String,
    pub sid: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub comp: CompressionTag,
    pub chk: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(flatten, default)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl CoreMetadata {
    /// Check `v` against the protocol version this crate supports.
    pub fn check_version(&self) -> Result<(), SdlpError> {
        if self.v == PROTOCOL_VERSION {
            Ok(())
        } else {
            Err(err(ErrorKind::InvalidStructure)
                .with_context("reason", "unsupported protocol version")
                .with_context("version", self.v.clone()))
        }
    }

    /// `now > exp` or `now < nbf`, with the caller-supplied skew applied
    /// symmetrically as slack in the permissive direction.
    pub fn check_time_bounds(&self, now: i64, skew_secs: i64) -> Result<(), SdlpError> {
        if let Some(exp) = self.exp {
            if now > exp + skew_secs {
                return Err(err(ErrorKind::TimeBoundsViolated)
                    .with_context("expiration", exp)
                    .with_context("now", now));
            }
        }
        if let Some(nbf) = self.nbf {
            if now < nbf - skew_secs {
                return Err(err(ErrorKind::TimeBoundsViolated)
                    .with_context("notBefore", nbf)
                    .with_context("now", now));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn did_url_regex_accepts_valid_shapes() {
        assert!(validate_did_url("did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK#z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK").is_ok());
        assert!(validate_did_url("did:web:acme.example#key-1").is_ok());
    }

    #[test]
    fn did_url_regex_rejects_missing_fragment() {
        assert!(validate_did_url("did:key:z6Mk").is_err());
    }

    #[test]
    fn did_base_strips_fragment() {
        assert_eq!(did_base("did:web:acme.example#key-1"), "did:web:acme.example");
        assert_eq!(did_base("did:web:acme.example"), "did:web:acme.example");
    }

    #[test]
    fn version_gate() {
        let mut m = sample_metadata();
        assert!(m.check_version().is_ok());
        m.v = "SDL-0.9".to_string();
        let e = m.check_version().unwrap_err();
        assert_eq!(e.kind, ErrorKind::InvalidStructure);
        assert_eq!(e.context.get("version").unwrap(), "SDL-0.9");
    }

    #[test]
    fn time_bounds_expired() {
        let mut m = sample_metadata();
        m.exp = Some(100);
        let e = m.check_time_bounds(200, 0).unwrap_err();
        assert_eq!(e.kind, ErrorKind::TimeBoundsViolated);
        assert_eq!(e.context.get("expiration").unwrap(), 100);
    }

    #[test]
    fn time_bounds_not_yet_valid() {
        let mut m = sample_metadata();
        m.nbf = Some(300);
        let e = m.check_time_bounds(200, 0).unwrap_err();
        assert_eq!(e.kind, ErrorKind::TimeBoundsViolated);
        assert_eq!(e.context.get("notBefore").unwrap(), 300);
    }

    #[test]
    fn time_bounds_skew_grants_slack() {
        let mut m = sample_metadata();
        m.exp = Some(100);
        assert!(m.check_time_bounds(105, 10).is_ok());
    }

    fn sample_metadata() -> CoreMetadata {
        CoreMetadata {
            v: PROTOCOL_VERSION.to_string(),
            sid: "did:key:z6Mk".to_string(),
            mime_type: "text/plain".to_string(),
            comp: CompressionTag::None,
            chk: "deadbeef".to_string(),
            exp: None,
            nbf: None,
            extra: HashMap::new(),
        }
    }
}
