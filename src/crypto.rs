//! Wallet cryptography: Ed25519 key handling, message signing and the
//! signature check used to admit ownership claims.
//!
//! A wallet address is the lowercase hex of its 32-byte verifying key; a
//! signature is the hex of the 64-byte Ed25519 signature over the UTF-8
//! bytes of the challenge message.

use ed25519_dalek::{Signature, SigningKey, VerifyingKey};
use ed25519_dalek::{Signer, Verifier};
use rand::rngs::OsRng;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

/// Checks that `signature` over `message` was produced by `address`.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, message: &str, address: &str, signature: &str) -> bool;
}

/// Ed25519 verification over hex-encoded addresses and signatures.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, message: &str, address: &str, signature: &str) -> bool {
        let Some(verifying) = parse_address(address) else {
            return false;
        };
        let Ok(sig_bytes) = hex::decode(signature.trim()) else {
            return false;
        };
        let Ok(sig) = Signature::from_slice(&sig_bytes) else {
            return false;
        };
        verify_bytes(&verifying, message.as_bytes(), &sig)
    }
}

/// Generate a fresh wallet key using the OS RNG.
pub fn generate_signing_key() -> SigningKey {
    let mut rng = OsRng;
    SigningKey::generate(&mut rng)
}

/// Wallet address (hex verifying key) for a signing key.
pub fn address_of(signing: &SigningKey) -> String {
    hex::encode(signing.verifying_key().to_bytes())
}

/// Canonical spelling of an address: trimmed, lowercase hex.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Decode a hex address into a verifying key.
pub fn parse_address(address: &str) -> Option<VerifyingKey> {
    let bytes: [u8; 32] = hex::decode(address.trim()).ok()?.try_into().ok()?;
    VerifyingKey::from_bytes(&bytes).ok()
}

/// Sign a challenge message, returning the hex signature a client submits.
pub fn sign_message(signing: &SigningKey, message: &str) -> String {
    hex::encode(signing.sign(message.as_bytes()).to_bytes())
}

/// Verify a message/signature pair using the provided verifying key.
pub fn verify_bytes(verifying: &VerifyingKey, msg: &[u8], sig: &Signature) -> bool {
    verifying.verify(msg, sig).is_ok()
}

/// Save (overwrite) the private key seed (32 bytes) to disk.
pub fn save_key(path: &Path, signing: &SigningKey) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut f = File::create(path)?;
    f.write_all(&signing.to_bytes())?;
    Ok(())
}

/// Load the private key seed (32 bytes) if present; `None` when the file is
/// missing or not exactly 32 bytes.
pub fn load_key(path: &Path) -> std::io::Result<Option<SigningKey>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut buf = Vec::new();
    File::open(path)?.read_to_end(&mut buf)?;
    let Ok(seed) = <[u8; 32]>::try_from(buf.as_slice()) else {
        return Ok(None);
    };
    Ok(Some(SigningKey::from_bytes(&seed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_message_verifies_for_its_address() {
        let key = generate_signing_key();
        let addr = address_of(&key);
        let msg = format!("{addr}:1700000000:starRegistry");
        let sig = sign_message(&key, &msg);
        assert!(Ed25519Verifier.verify(&msg, &addr, &sig));
    }

    #[test]
    fn wrong_key_or_message_fails() {
        let key = generate_signing_key();
        let other = generate_signing_key();
        let addr = address_of(&key);
        let sig = sign_message(&other, "hello");
        assert!(!Ed25519Verifier.verify("hello", &addr, &sig));

        let sig = sign_message(&key, "hello");
        assert!(!Ed25519Verifier.verify("hello!", &addr, &sig));
    }

    #[test]
    fn undecodable_inputs_fail_closed() {
        let key = generate_signing_key();
        let addr = address_of(&key);
        let sig = sign_message(&key, "m");
        assert!(!Ed25519Verifier.verify("m", "not-hex", &sig));
        assert!(!Ed25519Verifier.verify("m", &addr[..62], &sig));
        assert!(!Ed25519Verifier.verify("m", &addr, "zz"));
        assert!(!Ed25519Verifier.verify("m", &addr, &sig[..100]));
    }

    #[test]
    fn normalized_address_still_verifies() {
        let key = generate_signing_key();
        let addr = address_of(&key);
        assert_eq!(normalize_address(&format!("\t{}\n", addr.to_uppercase())), addr);
        assert_eq!(normalize_address(&addr), addr);

        let sig = sign_message(&key, "m");
        assert!(Ed25519Verifier.verify("m", &addr.to_uppercase(), &sig));
    }

    #[test]
    fn key_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet").join("key.bin");
        assert!(load_key(&path).unwrap().is_none());

        let key = generate_signing_key();
        save_key(&path, &key).unwrap();
        let loaded = load_key(&path).unwrap().unwrap();
        assert_eq!(address_of(&loaded), address_of(&key));
    }

    #[test]
    fn malformed_key_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.bin");
        fs::write(&path, [1u8; 7]).unwrap();
        assert!(load_key(&path).unwrap().is_none());
    }
}
