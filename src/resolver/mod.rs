//! The pluggable DID resolver contract (§4.3, §6).
//!
//! A `Resolver` is a single synchronous method, matching the teacher's
//! own blocking `fetch_jwks` call: no async runtime is introduced by this
//! crate. Built-in methods: `did:key` (offline) and `did:web` (HTTPS, no
//! redirects, 10s timeout). [`default_resolver`] returns the multiplexer
//! dispatching on the DID method segment.

pub mod did_key;
pub mod did_web;

use serde::{Deserialize, Serialize};

use crate::error::{err, ErrorKind, SdlpError};

/// A verification method entry inside a DID document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: String,
    pub controller: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<PublicKeyJwk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_base58: Option<String>,
}

/// A minimal OKP/Ed25519 JWK, as carried in a verification method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyJwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
}

/// A resolved DID document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DidDocument {
    pub id: String,
    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,
}

impl DidDocument {
    /// Find the verification method named by a full DID URL (`kid`).
    pub fn find_method(&self, kid: &str) -> Option<&VerificationMethod> {
        self.verification_method.iter().find(|m| m.id == kid)
    }
}

/// The result of a resolution attempt: either a document, or a structured
/// failure. Mirrors the `{document, resolutionMetadata, documentMetadata}`
/// shape of §4.3 with `document: null` collapsed into `Err`.
pub type ResolutionResult = Result<DidDocument, SdlpError>;

/// A DID resolver collaborator (§6's "Resolver collaborator contract").
pub trait Resolver: Send + Sync {
    fn resolve(&self, did: &str) -> ResolutionResult;
}

/// The default resolver: dispatches on the DID method segment to the
/// built-in `did:key` and `did:web` implementations.
pub struct DefaultResolver;

impl Resolver for DefaultResolver {
    fn resolve(&self, did: &str) -> ResolutionResult {
        if did.starts_with("did:key:") {
            did_key::resolve(did)
        } else if did.starts_with("did:web:") {
            did_web::resolve(did)
        } else {
            Err(err(ErrorKind::DidResolutionFailed)
                .with_context("reason", "unsupported DID method")
                .with_context("did", did.to_string()))
        }
    }
}

/// Construct the default multiplexer resolver.
pub fn default_resolver() -> DefaultResolver {
    DefaultResolver
}
