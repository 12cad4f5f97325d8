//! End-to-end scenarios (§8 S1-S6) and the cross-cutting testable
//! properties, exercised only through the crate's public API.

use ed25519_dalek::SigningKey as DalekSigningKey;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sdlp::resolver::{DidDocument, PublicKeyJwk, Resolver, VerificationMethod};
use sdlp::{
    b64url, create_link, verify_link, CompressionTag, CreateLinkOptions, ErrorKind, SigningKey,
    VerifyOptions,
};

fn seeded_dalek(seed: u64) -> DalekSigningKey {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    DalekSigningKey::generate(&mut rng)
}

/// Build a `did:key` signer whose `kid` actually encodes its own public
/// key, so the built-in offline resolver can recover it.
fn did_key_signer(seed: u64) -> SigningKey {
    let dalek = seeded_dalek(seed);
    let vk_bytes = dalek.verifying_key().to_bytes();
    let mut multicodec = vec![0xed, 0x01];
    multicodec.extend_from_slice(&vk_bytes);
    let did = format!("did:key:z{}", bs58::encode(multicodec).into_string());
    let kid = format!("{did}#{}", &did["did:key:".len()..]);
    SigningKey::from_ed25519(kid, &dalek)
}

/// A resolver test double standing in for a `did:web` HTTPS fetch, so S2
/// doesn't touch the network.
struct StaticResolver(DidDocument);
impl Resolver for StaticResolver {
    fn resolve(&self, _did: &str) -> sdlp::resolver::ResolutionResult {
        Ok(self.0.clone())
    }
}

fn acme_resolver(dalek: &DalekSigningKey) -> (StaticResolver, String) {
    let did = "did:web:acme.example".to_string();
    let kid = format!("{did}#key-1");
    let doc = DidDocument {
        id: did.clone(),
        verification_method: vec![VerificationMethod {
            id: kid.clone(),
            method_type: "Ed25519VerificationKey2020".to_string(),
            controller: did.clone(),
            public_key_jwk: Some(PublicKeyJwk {
                kty: "OKP".to_string(),
                crv: "Ed25519".to_string(),
                x: b64url::encode(dalek.verifying_key().as_bytes()),
            }),
            public_key_base58: None,
        }],
    };
    (StaticResolver(doc), kid)
}

#[test]
fn s1_happy_path_did_key_no_compression() {
    let signer = did_key_signer(1);
    let link = create_link(
        b"Hello, World!",
        "text/plain",
        &signer,
        &CreateLinkOptions::default(),
    )
    .unwrap();

    let result = verify_link(&link, &VerifyOptions::default()).unwrap();
    assert_eq!(result.sender, signer.sid());
    assert_eq!(result.payload, b"Hello, World!");
    assert_eq!(
        result.metadata.chk,
        sha256_hex(b"Hello, World!")
    );
}

#[test]
fn s2_happy_path_did_web() {
    let dalek = seeded_dalek(2);
    let (resolver, kid) = acme_resolver(&dalek);
    let signer = SigningKey::from_ed25519(kid, &dalek);

    let link = create_link(
        b"Hello from ACME Corp!",
        "text/plain",
        &signer,
        &CreateLinkOptions::default(),
    )
    .unwrap();

    let opts = VerifyOptions::default().with_resolver(&resolver);
    let result = verify_link(&link, &opts).unwrap();
    assert_eq!(result.sender, "did:web:acme.example");
    assert_eq!(result.payload, b"Hello from ACME Corp!");
}

#[test]
fn s3_signature_tamper_yields_signature_error() {
    let signer = did_key_signer(3);
    let link = create_link(b"Hello, World!", "text/plain", &signer, &CreateLinkOptions::default())
        .unwrap();
    let tampered = flip_last_byte_of_jws_field(&link, Field::Signature);
    let err = verify_link(&tampered, &VerifyOptions::default()).unwrap_err();
    assert_eq!(err.code, "E_SIGNATURE_VERIFICATION_FAILED");
}

#[test]
fn s4_payload_tamper_yields_integrity_error() {
    let signer = did_key_signer(4);
    let link = create_link(b"Hello, World!", "text/plain", &signer, &CreateLinkOptions::default())
        .unwrap();
    let jws_part = link.splitn(2, '.').next().unwrap();
    let tampered_payload_part = b64url::encode(b"Tampered payload");
    let tampered = format!("{jws_part}.{tampered_payload_part}");
    let err = verify_link(&tampered, &VerifyOptions::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::PayloadIntegrityFailed);
}

#[test]
fn s5_expired_link() {
    let signer = did_key_signer(5);
    let opts = CreateLinkOptions::default().with_expires_in(-3600);
    let link = create_link(b"x", "text/plain", &signer, &opts).unwrap();
    let err = verify_link(&link, &VerifyOptions::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TimeBoundsViolated);
    let exp = err.context.get("expiration").unwrap().as_i64().unwrap();
    let now = sdlp::now_ts();
    assert!(exp < now);
}

#[test]
fn s6_trailing_data_attack() {
    let signer = did_key_signer(6);
    let link = create_link(b"x", "text/plain", &signer, &CreateLinkOptions::default()).unwrap();
    let tampered = format!("{link}.extradata");
    let err = verify_link(&tampered, &VerifyOptions::default()).unwrap_err();
    assert_eq!(err.code, "E_INVALID_STRUCTURE");
}

#[test]
fn property_4_kid_base_always_equals_sid_on_success() {
    let signer = did_key_signer(7);
    let link = create_link(b"x", "text/plain", &signer, &CreateLinkOptions::default()).unwrap();
    let result = verify_link(&link, &VerifyOptions::default()).unwrap();
    assert_eq!(result.sender, signer.sid());
}

#[test]
fn property_5_single_byte_payload_tamper_is_integrity_not_signature_error() {
    let signer = did_key_signer(8);
    let link = create_link(
        b"flip one byte of me please",
        "text/plain",
        &signer,
        &CreateLinkOptions::default(),
    )
    .unwrap();
    let jws_part = link.splitn(2, '.').next().unwrap();
    let payload_part = link.splitn(2, '.').nth(1).unwrap();
    let mut bytes = b64url::decode(payload_part).unwrap();
    bytes[0] ^= 0x01;
    let tampered_payload_part = b64url::encode(&bytes);
    let tampered = format!("{jws_part}.{tampered_payload_part}");
    let err = verify_link(&tampered, &VerifyOptions::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::PayloadIntegrityFailed);
}

#[test]
fn property_6_header_tamper_fails_signature_after_integrity_passes() {
    let signer = did_key_signer(9);
    let link = create_link(b"x", "text/plain", &signer, &CreateLinkOptions::default()).unwrap();
    let tampered = flip_last_byte_of_jws_field(&link, Field::Protected);
    let err = verify_link(&tampered, &VerifyOptions::default()).unwrap_err();
    // A flipped protected-header byte still round-trips as a DID-URL
    // often enough in this fixture's alphabet to reach the signature
    // check; if it instead breaks structural/DID-URL validity, that is
    // still a rejection, just at an earlier gate. Either is acceptable,
    // but the link must never verify.
    assert!(matches!(
        err.kind,
        ErrorKind::SignatureVerificationFailed
            | ErrorKind::InvalidStructure
            | ErrorKind::DidMismatch
            | ErrorKind::DidResolutionFailed
    ));
}

#[test]
fn property_9_alg_outside_allow_list_is_signature_error() {
    let signer = did_key_signer(10);
    let link = create_link(b"x", "text/plain", &signer, &CreateLinkOptions::default()).unwrap();
    let opts = VerifyOptions::default().with_allowed_algorithms(vec!["ES256".to_string()]);
    let err = verify_link(&link, &opts).unwrap_err();
    assert_eq!(err.code, "E_SIGNATURE_VERIFICATION_FAILED");
}

#[test]
fn property_11_nbf_in_future_is_time_bounds_error() {
    let signer = did_key_signer(11);
    let opts = CreateLinkOptions::default().with_not_before_in(3600);
    let link = create_link(b"x", "text/plain", &signer, &opts).unwrap();
    let err = verify_link(&link, &VerifyOptions::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TimeBoundsViolated);
    assert!(err.context.contains_key("notBefore"));
}

#[test]
fn property_12_oversized_payload_is_rejected() {
    let signer = did_key_signer(12);
    let payload = vec![b'x'; 4096];
    let link = create_link(&payload, "application/octet-stream", &signer, &CreateLinkOptions::default())
        .unwrap();
    let opts = VerifyOptions::default().with_max_payload_size(1024);
    let err = verify_link(&link, &opts).unwrap_err();
    assert_eq!(err.kind, ErrorKind::PayloadDecompressionFailed);
}

#[test]
fn property_13_did_key_resolution_is_deterministic() {
    let signer = did_key_signer(13);
    let link_a = create_link(b"a", "text/plain", &signer, &CreateLinkOptions::default()).unwrap();
    let link_b = create_link(b"b", "text/plain", &signer, &CreateLinkOptions::default()).unwrap();
    let a = verify_link(&link_a, &VerifyOptions::default()).unwrap();
    let b = verify_link(&link_b, &VerifyOptions::default()).unwrap();
    assert_eq!(a.sender, b.sender);
}

#[test]
fn compression_round_trips_through_the_full_pipeline() {
    let signer = did_key_signer(14);
    let payload = b"compress this payload please ".repeat(100);
    let opts = CreateLinkOptions::default().with_compression(CompressionTag::Br);
    let link = create_link(&payload, "application/octet-stream", &signer, &opts).unwrap();
    let result = verify_link(&link, &VerifyOptions::default()).unwrap();
    assert_eq!(result.payload, payload);
    assert_eq!(result.metadata.comp, CompressionTag::Br);
}

#[derive(Clone, Copy)]
enum Field {
    Signature,
    Protected,
}

fn flip_last_byte_of_jws_field(link: &str, field: Field) -> String {
    let rest = link.strip_prefix("sdlp://").unwrap();
    let mut parts = rest.splitn(2, '.');
    let jws_part = parts.next().unwrap();
    let payload_part = parts.next().unwrap();
    let jws_bytes = b64url::decode(jws_part).unwrap();
    let mut jws: sdlp::jws::FlattenedJws = serde_json::from_slice(&jws_bytes).unwrap();
    let target = match field {
        Field::Signature => &mut jws.signature,
        Field::Protected => &mut jws.protected,
    };
    let mut bytes = b64url::decode(target).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    *target = b64url::encode(&bytes);
    let jws_json = serde_json::to_vec(&jws).unwrap();
    let new_jws_part = b64url::encode(&jws_json);
    format!("sdlp://{new_jws_part}.{payload_part}")
}

fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write;
    Sha256::digest(bytes)
        .iter()
        .fold(String::new(), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
}
