use std::fmt;

use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};
use sha2::{Digest, Sha256};

/// A participant's secp256k1 keypair.
/// The address is the hex of the compressed public key (33 bytes).
/// The secret key never leaves this struct: no serialization, no Debug output.
#[derive(Clone)]
pub struct Signer {
    secret_key: SecretKey,
    address: String,
}

impl Signer {
    /// Generate a fresh keypair from the OS RNG.
    pub fn new() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            address: hex::encode(public_key.serialize()),
        }
    }

    /// Public-key-derived address (stable for the lifetime of the signer).
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sign the SHA-256 digest of `payload`; returns a hex DER ECDSA signature.
    /// RFC 6979 nonces make this deterministic for a given key and payload.
    pub fn sign(&self, payload: &[u8]) -> String {
        let secp = Secp256k1::signing_only();
        let msg = Message::from_digest(sha256(payload));
        let sig = secp.sign_ecdsa(&msg, &self.secret_key);
        hex::encode(&sig.serialize_der()[..])
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

fn sha256(payload: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    hasher.finalize().into()
}

/// Derive address (hex of compressed pubkey) from a given hex pubkey.
/// Returns normalized hex (lowercase) if valid.
pub fn pubkey_to_address_hex(pubkey_hex: &str) -> Result<String, &'static str> {
    let bytes = hex::decode(pubkey_hex).map_err(|_| "invalid pubkey hex")?;
    let pk = PublicKey::from_slice(&bytes).map_err(|_| "invalid pubkey bytes")?;
    Ok(hex::encode(pk.serialize()))
}

/// Verify a hex DER signature over `payload` against an address (hex compressed pubkey).
pub fn verify_signature_hex(
    address: &str,
    sig_hex: &str,
    payload: &[u8],
) -> Result<bool, &'static str> {
    let secp = Secp256k1::verification_only();

    let sig_bytes = hex::decode(sig_hex).map_err(|_| "invalid signature hex")?;
    let sig = Signature::from_der(&sig_bytes).map_err(|_| "invalid DER signature")?;

    let pk_bytes = hex::decode(address).map_err(|_| "invalid pubkey hex")?;
    let pk = PublicKey::from_slice(&pk_bytes).map_err(|_| "invalid pubkey bytes")?;

    let msg = Message::from_digest(sha256(payload));
    Ok(secp.verify_ecdsa(&msg, &sig, &pk).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_stable_and_compressed() {
        let signer = Signer::new();
        let first = signer.address().to_string();
        assert_eq!(first, signer.address());
        assert_eq!(first.len(), 66);
        assert!(first.starts_with("02") || first.starts_with("03"));
        assert_eq!(pubkey_to_address_hex(&first).unwrap(), first);
    }

    #[test]
    fn independent_signers_do_not_collide() {
        let a = Signer::new();
        let b = Signer::new();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn signatures_are_deterministic_and_verify() {
        let signer = Signer::new();
        let sig = signer.sign(b"payload");
        assert_eq!(sig, signer.sign(b"payload"));
        assert!(verify_signature_hex(signer.address(), &sig, b"payload").unwrap());
        assert!(!verify_signature_hex(signer.address(), &sig, b"tampered").unwrap());
    }

    #[test]
    fn foreign_key_does_not_verify() {
        let signer = Signer::new();
        let other = Signer::new();
        let sig = signer.sign(b"payload");
        assert!(!verify_signature_hex(other.address(), &sig, b"payload").unwrap());
    }

    #[test]
    fn malformed_inputs_are_errors() {
        let signer = Signer::new();
        assert!(verify_signature_hex(signer.address(), "zz", b"p").is_err());
        assert!(verify_signature_hex("not-hex", &signer.sign(b"p"), b"p").is_err());
        assert!(pubkey_to_address_hex("abcd").is_err());
    }

    #[test]
    fn debug_hides_secret() {
        let signer = Signer::new();
        let out = format!("{signer:?}");
        assert!(out.contains(signer.address()));
        assert!(!out.contains(&hex::encode(signer.secret_key.secret_bytes())));
    }
}
