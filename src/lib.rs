//! The Secure Deep Link Protocol (SDLP) codec: DID-signed, tamper-evident
//! deep links of the shape `<scheme>://<jws>.<payload>`.
//!
//! [`create_link`] serializes a typed payload, signs its metadata under a
//! caller-supplied Ed25519 [`SigningKey`], and frames the result as a
//! single link string. [`verify_link`] runs the reverse pipeline — parse,
//! structural validation, algorithm gate, time bounds, DID resolution,
//! key selection, decompression, integrity, signature — and returns a
//! closed success/failure sum type: [`VerificationResult`].
//!
//! This crate signs and authenticates; it does not encrypt. There is no
//! confidentiality guarantee over the payload (see the protocol spec's
//! Non-goals).

#![forbid(unsafe_code)]

/// Re-exported so downstream callers can canonicalize their own JSON the
/// same way the signing path does, without redeclaring the dependency.
pub use json_atomic;

pub mod b64url;
pub mod compression;
pub mod create;
pub mod error;
pub mod jws;
pub mod key;
pub mod metadata;
pub mod resolver;
pub mod verify;

pub use compression::CompressionTag;
pub use create::{create_link, CreateLinkOptions, DEFAULT_SCHEME};
pub use error::{ErrorKind, SdlpError};
pub use key::SigningKey;
pub use metadata::{CoreMetadata, ProtectedHeader, PROTOCOL_VERSION};
pub use resolver::{default_resolver, DefaultResolver, DidDocument, Resolver, VerificationMethod};
pub use verify::{
    verify_link, ReplayCache, VerificationResult, VerifiedLink, VerifyOptions,
    ABSOLUTE_MAX_PAYLOAD_SIZE, DEFAULT_MAX_PAYLOAD_SIZE, HARD_LINK_LENGTH_CEILING,
    SOFT_LINK_LENGTH_CEILING,
};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in seconds, used as "now" when the caller doesn't
/// pin one explicitly (`CreateLinkOptions`/`VerifyOptions::now`).
pub fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
