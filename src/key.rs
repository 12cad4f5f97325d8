//! The signing key supplied by a caller to `create_link` (§3).

use ed25519_dalek::SigningKey as DalekSigningKey;
use serde::{Deserialize, Serialize};

use crate::b64url;
use crate::error::{err, ErrorKind, SdlpError};
use crate::metadata::{did_base, validate_did_url};

/// A JWK-equivalent Ed25519 signing key plus the `kid` that names it.
///
/// Mirrors the teacher's `Jwk` record (`kty`/`crv`/`x`) on the verification
/// side, extended with the private `d` seed needed to sign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningKey {
    pub kid: String,
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub d: String,
}

impl SigningKey {
    /// Build a signing key from raw Ed25519 key material and a `kid`.
    pub fn from_ed25519(kid: impl Into<String>, dalek_key: &DalekSigningKey) -> Self {
        Self {
            kid: kid.into(),
            kty: "OKP".to_string(),
            crv: "Ed25519".to_string(),
            x: b64url::encode(dalek_key.verifying_key().as_bytes()),
            d: b64url::encode(&dalek_key.to_bytes()),
        }
    }

    /// The sender DID: `kid` without its fragment.
    pub fn sid(&self) -> &str {
        did_base(&self.kid)
    }

    /// Validate `kid` shape and decode the private key material.
    pub fn to_dalek(&self) -> Result<DalekSigningKey, SdlpError> {
        validate_did_url(&self.kid)?;
        if self.kty != "OKP" || self.crv != "Ed25519" {
            return Err(err(ErrorKind::InvalidStructure)
                .with_context("reason", "signing key is not an Ed25519 OKP JWK"));
        }
        let seed = b64url::decode(&self.d)?;
        let seed: [u8; 32] = seed
            .try_into()
            .map_err(|_| err(ErrorKind::InvalidStructure).with_context("reason", "d is not 32 bytes"))?;
        Ok(DalekSigningKey::from_bytes(&seed))
    }
}
