//! Compact JWS with Ed25519 (`alg: EdDSA`)

use crate::{TokenError, TokenResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub(crate) const ALGORITHM: &str = "EdDSA";
pub(crate) const CAPABILITY_TYP: &str = "convention+jwt";
pub(crate) const BACKOFFICE_TYP: &str = "backoffice+jwt";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Serialize, sign and encode a payload
pub(crate) fn seal<T: Serialize>(key: &SigningKey, typ: &str, payload: &T) -> TokenResult<String> {
    let header = Header {
        alg: ALGORITHM.to_string(),
        typ: typ.to_string(),
    };
    let header_json =
        serde_json::to_vec(&header).map_err(|e| TokenError::Encoding(e.to_string()))?;
    let payload_json =
        serde_json::to_vec(payload).map_err(|e| TokenError::Encoding(e.to_string()))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(payload_json)
    );
    let signature = key.sign(signing_input.as_bytes());
    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    ))
}

/// Check the signature of a compact token, then decode its payload.
///
/// The signature is verified before anything else is parsed, so a forged
/// token never reaches the expiry or version checks.
pub(crate) fn open<T: DeserializeOwned>(
    key: &VerifyingKey,
    expected_typ: &str,
    token: &str,
) -> TokenResult<T> {
    let token = token.trim();
    let mut segments = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::Malformed("expected three segments".to_string()));
    };

    let signature_bytes: [u8; 64] = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| TokenError::Malformed("signature is not base64url".to_string()))?
        .try_into()
        .map_err(|_| TokenError::Malformed("signature must be 64 bytes".to_string()))?;
    let signature = Signature::from_bytes(&signature_bytes);

    let signing_input_len = header_b64.len() + 1 + payload_b64.len();
    let signing_input = &token[..signing_input_len];
    key.verify_strict(signing_input.as_bytes(), &signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    let header: Header = decode_segment(header_b64, "header")?;
    if header.alg != ALGORITHM || header.typ != expected_typ {
        return Err(TokenError::Malformed(format!(
            "unexpected header {}/{}",
            header.alg, header.typ
        )));
    }
    decode_segment(payload_b64, "payload")
}

fn decode_segment<T: DeserializeOwned>(segment: &str, name: &str) -> TokenResult<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed(format!("{name} is not base64url")))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(format!("{name}: {e}")))
}
