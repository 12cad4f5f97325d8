//! Offline `did:key` resolution (§4.3).
//!
//! `did:key:z<base58btc>` where the base58-decoded bytes are a two-byte
//! multicodec prefix (`0xED 0x01` for Ed25519) followed by the 32-byte
//! public key. Resolution is a pure function: the same DID always yields
//! the same key bytes (invariant 13 of §8).

use crate::b64url;
use crate::error::{err, ErrorKind, SdlpError};

use super::{DidDocument, PublicKeyJwk, VerificationMethod};

const ED25519_MULTICODEC_PREFIX: [u8; 2] = [0xed, 0x01];

pub fn resolve(did: &str) -> Result<DidDocument, SdlpError> {
    let suffix = did
        .strip_prefix("did:key:")
        .ok_or_else(|| did_resolution_error(did, "not a did:key identifier"))?;
    let multibase_suffix = suffix
        .strip_prefix('z')
        .ok_or_else(|| did_resolution_error(did, "did:key must use the 'z' (base58btc) multibase prefix"))?;

    let decoded = bs58::decode(multibase_suffix)
        .into_vec()
        .map_err(|e| did_resolution_error(did, &format!("base58 decode failed: {e}")))?;

    if decoded.len() < 2 || decoded[..2] != ED25519_MULTICODEC_PREFIX[..] {
        return Err(did_resolution_error(
            did,
            "unsupported key type (only Ed25519 multicodec 0xed01 is supported)",
        ));
    }
    let public_key = &decoded[2..];
    if public_key.len() != 32 {
        return Err(did_resolution_error(did, "Ed25519 public key must be 32 bytes"));
    }

    let method_id = format!("{did}#{suffix}");
    Ok(DidDocument {
        id: did.to_string(),
        verification_method: vec![VerificationMethod {
            id: method_id,
            method_type: "Ed25519VerificationKey2020".to_string(),
            controller: did.to_string(),
            public_key_jwk: Some(PublicKeyJwk {
                kty: "OKP".to_string(),
                crv: "Ed25519".to_string(),
                x: b64url::encode(public_key),
            }),
            public_key_base58: None,
        }],
    })
}

fn did_resolution_error(did: &str, reason: &str) -> SdlpError {
    err(ErrorKind::DidResolutionFailed)
        .with_context("did", did.to_string())
        .with_context("reason", reason.to_string())
}
