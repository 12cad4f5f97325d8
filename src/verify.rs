//! `verify_link` (§4.7): the normative parse → validate → resolve →
//! decompress → integrity → signature state machine.

use ed25519_dalek::VerifyingKey;

use crate::b64url;
use crate::compression;
use crate::error::{err, ErrorKind, SdlpError};
use crate::jws::FlattenedJws;
use crate::metadata::{did_base, CoreMetadata};
use crate::now_ts;
use crate::resolver::{self, DidDocument, Resolver, VerificationMethod};

/// Absolute ceiling on decompressed payload size (§5 resource caps).
pub const ABSOLUTE_MAX_PAYLOAD_SIZE: u64 = 100 * 1024 * 1024;
/// Default `max_payload_size` when the caller doesn't override it.
pub const DEFAULT_MAX_PAYLOAD_SIZE: u64 = 10 * 1024 * 1024;
/// Hard ceiling on link length; anything larger is malformed outright.
pub const HARD_LINK_LENGTH_CEILING: usize = 100 * 1024 * 1024;
/// Recommended soft ceiling on link length (advisory only, not enforced).
pub const SOFT_LINK_LENGTH_CEILING: usize = 64 * 1024;

static DEFAULT_RESOLVER: resolver::DefaultResolver = resolver::DefaultResolver;

/// A collaborator hosts may supply to reject links already seen (§4.4
/// `E_REPLAY_DETECTED`, §8 "reserved... surfaced only when the host
/// supplies a JTI cache"). The core ships no implementation of this trait.
pub trait ReplayCache: Send + Sync {
    /// Returns `true` if `token` has been seen before; remembers it either
    /// way so a subsequent call with the same token also returns `true`.
    fn seen_before(&self, token: &str) -> bool;
}

/// Options accepted by [`verify_link`]. Every field has the spec-mandated
/// default (§6).
pub struct VerifyOptions<'a> {
    pub resolver: &'a dyn Resolver,
    pub allowed_algorithms: Vec<String>,
    pub max_payload_size: u64,
    /// Seconds of slack applied to `exp`/`nbf` checks. The spec default is
    /// zero (§9 open question: "the source applies no clock skew
    /// tolerance... a policy decision deferred to the caller").
    pub clock_skew_secs: i64,
    pub replay_cache: Option<&'a dyn ReplayCache>,
    pub scheme: String,
    /// Override "now", for deterministic tests. Defaults to the system
    /// clock.
    pub now: Option<i64>,
}

impl<'a> Default for VerifyOptions<'a> {
    fn default() -> Self {
        Self {
            resolver: &DEFAULT_RESOLVER,
            allowed_algorithms: vec!["EdDSA".to_string()],
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            clock_skew_secs: 0,
            replay_cache: None,
            scheme: crate::create::DEFAULT_SCHEME.to_string(),
            now: None,
        }
    }
}

impl<'a> VerifyOptions<'a> {
    pub fn with_resolver(mut self, resolver: &'a dyn Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_allowed_algorithms(mut self, algs: Vec<String>) -> Self {
        self.allowed_algorithms = algs;
        self
    }

    pub fn with_max_payload_size(mut self, bytes: u64) -> Self {
        self.max_payload_size = bytes;
        self
    }

    pub fn with_clock_skew(mut self, secs: i64) -> Self {
        self.clock_skew_secs = secs;
        self
    }

    pub fn with_replay_cache(mut self, cache: &'a dyn ReplayCache) -> Self {
        self.replay_cache = Some(cache);
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_now(mut self, now: i64) -> Self {
        self.now = Some(now);
        self
    }
}

/// A successfully verified link: the sender identity, the recovered
/// payload, the signed metadata, and (if resolution produced one) the DID
/// document that supplied the verifying key.
#[derive(Debug, Clone)]
pub struct VerifiedLink {
    pub sender: String,
    pub payload: Vec<u8>,
    pub metadata: CoreMetadata,
    pub document: Option<DidDocument>,
}

/// The closed success/failure sum type `verify_link` returns (§9: "this
/// eliminates the `valid == true` runtime guard pattern... and makes
/// exhaustive handling a compile-time property").
pub type VerificationResult = Result<VerifiedLink, SdlpError>;

/// Run the full verification state machine (§4.7) over `link`.
pub fn verify_link(link: &str, opts: &VerifyOptions) -> VerificationResult {
    tracing::debug!(target: "sdlp::verify", link_len = link.len(), "verifying link");
    let result = verify_link_inner(link, opts);
    match &result {
        Ok(v) => tracing::debug!(target: "sdlp::verify", sender = %v.sender, "verification succeeded"),
        Err(e) => tracing::warn!(target: "sdlp::verify", code = e.code, "verification failed"),
    }
    result
}

fn verify_link_inner(link: &str, opts: &VerifyOptions) -> VerificationResult {
    // Programming-contract violations surface as InvalidStructure (§7).
    if opts.max_payload_size == 0 || opts.max_payload_size > ABSOLUTE_MAX_PAYLOAD_SIZE {
        return Err(malformed("max_payload_size must be in (0, 100 MiB]"));
    }
    if opts.allowed_algorithms.is_empty() {
        return Err(malformed("allowed_algorithms must not be empty"));
    }

    // PARSE
    if link.len() > HARD_LINK_LENGTH_CEILING {
        return Err(malformed("link exceeds the maximum allowed length"));
    }
    let prefix = format!("{}://", opts.scheme);
    let rest = link
        .strip_prefix(prefix.as_str())
        .ok_or_else(|| malformed("link does not start with the expected scheme"))?;
    let mut split = rest.splitn(2, '.');
    let jws_part = split.next().unwrap_or("");
    let payload_part = split
        .next()
        .ok_or_else(|| malformed("link is missing the '.' separator"))?;
    if jws_part.is_empty() || payload_part.is_empty() {
        return Err(malformed("jws or payload part is empty"));
    }
    if payload_part.contains('.') {
        return Err(malformed("link has trailing data after the payload part"));
    }

    // DECODE_JWS
    let jws_bytes = b64url::decode(jws_part)?;
    let jws: FlattenedJws = serde_json::from_slice(&jws_bytes)
        .map_err(|e| malformed(&format!("jws is not valid json: {e}")))?;
    jws.validate_shape()?;
    let header = jws.decode_header()?;
    let metadata = jws.decode_metadata()?;
    metadata.check_version()?;

    // CHECK_ALG
    if !opts.allowed_algorithms.iter().any(|a| a == &header.alg) {
        return Err(err(ErrorKind::SignatureVerificationFailed)
            .with_context("reason", "alg not in allowed list")
            .with_context("alg", header.alg.clone()));
    }

    // CHECK_TIME
    let now = opts.now.unwrap_or_else(now_ts);
    metadata.check_time_bounds(now, opts.clock_skew_secs)?;

    // CHECK_BINDING
    let kid_base = did_base(&header.kid);
    if kid_base != metadata.sid {
        return Err(err(ErrorKind::DidMismatch)
            .with_context("kid_base", kid_base.to_string())
            .with_context("sid", metadata.sid.clone()));
    }

    // RESOLVE_DID
    tracing::debug!(target: "sdlp::verify", sid = %metadata.sid, "resolving sender DID");
    let document = opts.resolver.resolve(&metadata.sid)?;

    // SELECT_KEY
    let method = document.find_method(&header.kid).ok_or_else(|| {
        err(ErrorKind::KeyNotFound)
            .with_context("kid", header.kid.clone())
            .with_context("did", metadata.sid.clone())
    })?;
    let verifying_key = verifying_key_from_method(method)?;

    // DECODE_PAYLOAD
    let compressed = b64url::decode(payload_part)?;

    // DECOMPRESS (also serves as the decompressed-size gate, §8 property 12)
    let payload = compression::decompress(&compressed, metadata.comp, opts.max_payload_size)?;

    // INTEGRITY (checked before signature: §3 invariant 2, §4.7 note)
    let chk = to_hex(&sha256(&payload));
    if chk != metadata.chk.to_lowercase() {
        return Err(err(ErrorKind::PayloadIntegrityFailed)
            .with_context("expected", metadata.chk.clone())
            .with_context("actual", chk));
    }

    // SIGNATURE
    jws.verify_signature(&verifying_key)?;

    if let Some(cache) = opts.replay_cache {
        if cache.seen_before(&jws.signature) {
            return Err(err(ErrorKind::ReplayDetected)
                .with_context("sid", metadata.sid.clone()));
        }
    }

    Ok(VerifiedLink {
        sender: metadata.sid.clone(),
        payload,
        metadata,
        document: Some(document),
    })
}

fn malformed(reason: &str) -> SdlpError {
    err(ErrorKind::InvalidStructure).with_context("reason", reason.to_string())
}

fn verifying_key_from_method(method: &VerificationMethod) -> Result<VerifyingKey, SdlpError> {
    if let Some(jwk) = &method.public_key_jwk {
        if jwk.kty == "OKP" && jwk.crv == "Ed25519" {
            let bytes = b64url::decode(&jwk.x)?;
            let arr: [u8; 32] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| key_not_found("jwk public key is not 32 bytes"))?;
            return VerifyingKey::from_bytes(&arr)
                .map_err(|_| key_not_found("jwk does not encode a valid Ed25519 point"));
        }
    }
    if let Some(b58) = &method.public_key_base58 {
        if method.method_type == "Ed25519VerificationKey2018" {
            let bytes = bs58::decode(b58)
                .into_vec()
                .map_err(|_| key_not_found("public_key_base58 is not valid base58"))?;
            let arr: [u8; 32] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| key_not_found("base58 public key is not 32 bytes"))?;
            return VerifyingKey::from_bytes(&arr)
                .map_err(|_| key_not_found("base58 key does not encode a valid Ed25519 point"));
        }
    }
    Err(key_not_found(
        "verification method does not expose a usable Ed25519 key",
    ))
}

fn key_not_found(reason: &str) -> SdlpError {
    err(ErrorKind::KeyNotFound).with_context("reason", reason.to_string())
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    Sha256::digest(bytes).into()
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}
