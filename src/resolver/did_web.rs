//! `did:web` resolution over HTTPS (§4.3).
//!
//! Transforms `did:web:<domain>[:<path>...]` into
//! `https://<domain>/[<path>/...]did.json`, fetches it with redirects
//! disabled and a 10 second timeout, and validates `document.id == did`.
//! Reuses the teacher's `ureq`-based blocking HTTP style (`fetch_jwks`).

use std::time::Duration;

use crate::error::{err, ErrorKind, SdlpError};

use super::DidDocument;

const TIMEOUT: Duration = Duration::from_secs(10);

/// Domains ending in `.example` are treated as never-resolvable, for test
/// hygiene (documents, vectors and fixtures may reference them freely
/// without this crate ever attempting a real fetch).
fn is_reserved_example_domain(domain: &str) -> bool {
    domain.rsplit('.').next() == Some("example")
}

/// Translate a `did:web` identifier into the HTTPS URL it resolves to.
pub fn to_url(did: &str) -> Result<String, SdlpError> {
    let suffix = did
        .strip_prefix("did:web:")
        .ok_or_else(|| did_resolution_error(did, "not a did:web identifier"))?;
    if suffix.is_empty() {
        return Err(did_resolution_error(did, "did:web is missing a domain"));
    }

    let mut segments = suffix.split(':');
    let domain = segments.next().unwrap();
    let domain = percent_decode(domain);
    let path_segments: Vec<String> = segments.map(percent_decode).collect();

    if path_segments.is_empty() {
        Ok(format!("https://{domain}/.well-known/did.json"))
    } else {
        Ok(format!("https://{domain}/{}/did.json", path_segments.join("/")))
    }
}

pub fn resolve(did: &str) -> Result<DidDocument, SdlpError> {
    let suffix = did
        .strip_prefix("did:web:")
        .ok_or_else(|| did_resolution_error(did, "not a did:web identifier"))?;
    let domain = suffix.split(':').next().unwrap_or_default();
    if is_reserved_example_domain(domain) {
        return Err(did_resolution_error(did, "domain is reserved for test fixtures"));
    }

    let url = to_url(did)?;
    tracing::debug!(target: "sdlp::resolver::did_web", host = %domain, "resolving did:web");

    let agent = ureq::AgentBuilder::new()
        .timeout(TIMEOUT)
        .redirects(0)
        .build();
    let response = agent
        .get(&url)
        .set("Accept", "application/json")
        .call()
        .map_err(|e| {
            tracing::warn!(target: "sdlp::resolver::did_web", host = %domain, "resolution failed");
            did_resolution_error(did, &format!("transport error: {e}"))
        })?;
    let body = response
        .into_string()
        .map_err(|e| did_resolution_error(did, &format!("failed to read response body: {e}")))?;
    let doc: DidDocument = serde_json::from_str(&body)
        .map_err(|e| did_resolution_error(did, &format!("invalid did document json: {e}")))?;

    if doc.id != did {
        return Err(did_resolution_error(did, "document id does not match requested did"));
    }
    Ok(doc)
}

fn percent_decode(segment: &str) -> String {
    segment.replace("%3A", ":").replace("%3a", ":")
}

fn did_resolution_error(did: &str, reason: &str) -> SdlpError {
    err(ErrorKind::DidResolutionFailed)
        .with_context("did", did.to_string())
        .with_context("reason", reason.to_string())
}
