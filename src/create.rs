//! `create_link` (§4.6): hash → compress → encode → sign → concatenate.

use sha2::{Digest, Sha256};

use crate::b64url;
use crate::compression::{self, CompressionTag};
use crate::error::{err, ErrorKind, SdlpError};
use crate::jws;
use crate::key::SigningKey;
use crate::metadata::{CoreMetadata, ProtectedHeader, PROTOCOL_VERSION};
use crate::now_ts;

/// The default link scheme, `sdlp://...`.
pub const DEFAULT_SCHEME: &str = "sdlp";

/// Optional knobs for [`create_link`]; everything here has a spec-mandated
/// default, matching the teacher's `VerifyOptions` builder idiom.
#[derive(Debug, Clone)]
pub struct CreateLinkOptions {
    pub compress: CompressionTag,
    pub expires_in: Option<i64>,
    pub not_before_in: Option<i64>,
    pub scheme: String,
}

impl Default for CreateLinkOptions {
    fn default() -> Self {
        Self {
            compress: CompressionTag::None,
            expires_in: None,
            not_before_in: None,
            scheme: DEFAULT_SCHEME.to_string(),
        }
    }
}

impl CreateLinkOptions {
    pub fn with_compression(mut self, tag: CompressionTag) -> Self {
        self.compress = tag;
        self
    }

    /// `exp = now + secs`.
    pub fn with_expires_in(mut self, secs: i64) -> Self {
        self.expires_in = Some(secs);
        self
    }

    /// `nbf = now + secs`.
    pub fn with_not_before_in(mut self, secs: i64) -> Self {
        self.not_before_in = Some(secs);
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }
}

/// Serialize, sign, and frame `payload` as a single SDLP link string
/// (§4.6 steps 1-10).
pub fn create_link(
    payload: &[u8],
    payload_type: &str,
    signer: &SigningKey,
    opts: &CreateLinkOptions,
) -> Result<String, SdlpError> {
    tracing::debug!(
        target: "sdlp::create",
        payload_len = payload.len(),
        mime = payload_type,
        comp = opts.compress.as_str(),
        "creating link"
    );
    crate::metadata::validate_did_url(&signer.kid)?;
    let dalek_key = signer.to_dalek()?;

    if payload.is_empty() {
        return Err(err(ErrorKind::InvalidStructure)
            .with_context("reason", "payload must not be empty"));
    }

    let chk = to_hex(&Sha256::digest(payload));
    let compressed = compression::compress(payload, opts.compress)?;
    let payload_part = b64url::encode(&compressed);

    let now = now_ts();
    let metadata = CoreMetadata {
        v: PROTOCOL_VERSION.to_string(),
        sid: signer.sid().to_string(),
        mime_type: payload_type.to_string(),
        comp: opts.compress,
        chk,
        exp: opts.expires_in.map(|secs| now + secs),
        nbf: opts.not_before_in.map(|secs| now + secs),
        extra: Default::default(),
    };
    let header = ProtectedHeader::new(signer.kid.clone());

    let jws_obj = jws::sign(&header, &metadata, &dalek_key)?;
    let jws_json = serde_json::to_vec(&jws_obj)
        .map_err(|e| err(ErrorKind::InvalidStructure).with_context("reason", e.to_string()))?;
    let jws_part = b64url::encode(&jws_json);

    let link = format!("{}://{}.{}", opts.scheme, jws_part, payload_part);
    tracing::debug!(target: "sdlp::create", link_len = link.len(), "link created");
    Ok(link)
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}
