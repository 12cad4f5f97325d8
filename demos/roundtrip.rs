use ed25519_dalek::SigningKey as DalekSigningKey;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sdlp::{create_link, verify_link, CreateLinkOptions, SigningKey, VerifyOptions};

fn main() -> anyhow::Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let dalek = DalekSigningKey::generate(&mut rng);
    let vk_bytes = dalek.verifying_key().to_bytes();

    let mut multicodec = vec![0xed, 0x01];
    multicodec.extend_from_slice(&vk_bytes);
    let did = format!("did:key:z{}", bs58::encode(multicodec).into_string());
    let kid = format!("{did}#{}", &did["did:key:".len()..]);
    let signer = SigningKey::from_ed25519(kid, &dalek);

    let link = create_link(
        b"Hello, World!",
        "text/plain",
        &signer,
        &CreateLinkOptions::default(),
    )?;
    println!("link = {link}");

    let verified = verify_link(&link, &VerifyOptions::default())
        .map_err(|e| anyhow::anyhow!("verification failed: {} ({})", e.message, e.code))?;
    println!(
        "verified sender = {}, payload = {}",
        verified.sender,
        String::from_utf8_lossy(&verified.payload)
    );
    Ok(())
}
