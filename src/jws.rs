//! JWS Flattened JSON Serialization: three Base64URL strings
//! (`protected`, `payload`, `signature`) over a single Ed25519 signature
//! (§3, §4.6 steps 6-9, §4.7 `DECODE_JWS`/`SIGNATURE`).

use ed25519_dalek::{Signature, Signer, SigningKey as DalekSigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::b64url;
use crate::error::{err, ErrorKind, SdlpError};
use crate::metadata::{CoreMetadata, ProtectedHeader};

/// A JWS object in Flattened JSON Serialization: exactly three non-empty
/// Base64URL string fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlattenedJws {
    pub protected: String,
    pub payload: String,
    pub signature: String,
}

impl FlattenedJws {
    /// Structural validity: all three fields present and non-empty
    /// (invariant 4 of §3).
    pub fn validate_shape(&self) -> Result<(), SdlpError> {
        if self.protected.is_empty() || self.payload.is_empty() || self.signature.is_empty() {
            return Err(err(ErrorKind::InvalidStructure)
                .with_context("reason", "jws is missing a required field"));
        }
        Ok(())
    }

    /// The exact bytes that were/are signed: `protected || "." || payload`.
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.protected, self.payload)
    }

    /// Decode `protected` into a typed header.
    pub fn decode_header(&self) -> Result<ProtectedHeader, SdlpError> {
        let bytes = b64url::decode(&self.protected)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| err(ErrorKind::InvalidStructure).with_context("reason", e.to_string()))
    }

    /// Decode `payload` into typed core metadata.
    pub fn decode_metadata(&self) -> Result<CoreMetadata, SdlpError> {
        let bytes = b64url::decode(&self.payload)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| err(ErrorKind::InvalidStructure).with_context("reason", e.to_string()))
    }

    /// Verify the Ed25519 signature over `signing_input()` under `vk`.
    pub fn verify_signature(&self, vk: &VerifyingKey) -> Result<(), SdlpError> {
        let sig_bytes = b64url::decode(&self.signature)?;
        let sig_bytes: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
            err(ErrorKind::SignatureVerificationFailed)
                .with_context("reason", "signature is not 64 bytes")
        })?;
        let sig = Signature::from_bytes(&sig_bytes);
        vk.verify_strict(self.signing_input().as_bytes(), &sig)
            .map_err(|_| err(ErrorKind::SignatureVerificationFailed))
    }
}

/// Build and sign a Flattened JWS over canonical JSON encodings of `header`
/// and `metadata`.
pub fn sign(
    header: &ProtectedHeader,
    metadata: &CoreMetadata,
    signer: &DalekSigningKey,
) -> Result<FlattenedJws, SdlpError> {
    let header_value = serde_json::to_value(header)
        .map_err(|e| err(ErrorKind::InvalidStructure).with_context("reason", e.to_string()))?;
    let metadata_value = serde_json::to_value(metadata)
        .map_err(|e| err(ErrorKind::InvalidStructure).with_context("reason", e.to_string()))?;
    let header_bytes = json_atomic::canonize(&header_value)
        .map_err(|e| err(ErrorKind::InvalidStructure).with_context("reason", e.to_string()))?;
    let metadata_bytes = json_atomic::canonize(&metadata_value)
        .map_err(|e| err(ErrorKind::InvalidStructure).with_context("reason", e.to_string()))?;

    let protected = b64url::encode(&header_bytes);
    let payload = b64url::encode(&metadata_bytes);
    let signing_input = format!("{protected}.{payload}");
    let signature = signer.sign(signing_input.as_bytes());

    Ok(FlattenedJws {
        protected,
        payload,
        signature: b64url::encode(&signature.to_bytes()),
    })
}
