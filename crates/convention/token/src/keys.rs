//! Ed25519 key material
//!
//! Keys are exchanged as lowercase hex: 32 bytes for both the private
//! signing key and the public verifying key.

use crate::{TokenError, TokenResult};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::path::Path;

/// Generate a fresh signing key from the OS random source
pub fn generate_signing_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

pub fn signing_key_from_hex(encoded: &str) -> TokenResult<SigningKey> {
    let bytes = decode_key_bytes(encoded)?;
    Ok(SigningKey::from_bytes(&bytes))
}

pub fn verifying_key_from_hex(encoded: &str) -> TokenResult<VerifyingKey> {
    let bytes = decode_key_bytes(encoded)?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| TokenError::InvalidKey(e.to_string()))
}

pub fn signing_key_to_hex(key: &SigningKey) -> String {
    hex::encode(key.to_bytes())
}

pub fn verifying_key_to_hex(key: &VerifyingKey) -> String {
    hex::encode(key.as_bytes())
}

/// Read a hex-encoded signing key from a file
pub fn read_signing_key(path: impl AsRef<Path>) -> TokenResult<SigningKey> {
    let path = path.as_ref();
    let encoded = std::fs::read_to_string(path)
        .map_err(|e| TokenError::InvalidKey(format!("cannot read {}: {e}", path.display())))?;
    signing_key_from_hex(&encoded)
}

fn decode_key_bytes(encoded: &str) -> TokenResult<[u8; 32]> {
    hex::decode(encoded.trim())
        .map_err(|e| TokenError::InvalidKey(e.to_string()))?
        .try_into()
        .map_err(|bytes: Vec<u8>| {
            TokenError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len()))
        })
}
