//! Convention Capability Tokens
//!
//! Authorization on a convention is carried by **capability tokens**
//! embedded in emailed magic links, not by server-side sessions. A token
//! names one convention, one role and the `token_version` of the convention
//! at issue time, and is signed with Ed25519 so that any service holding the
//! public key can verify it offline.
//!
//! # Wire format
//!
//! A compact JWS: `base64url(header).base64url(payload).base64url(signature)`
//! without padding, where the signature covers the first two segments.
//!
//! # Verification layers
//!
//! 1. **Signature** (always enforced, checked first).
//! 2. **Freshness**: expiry and `token_version`. Only the renewal path may
//!    skip this layer, through [`TokenVerifier::decode_without_verifying`].

#![deny(unsafe_code)]

mod claims;
mod errors;
mod jws;
mod keys;
mod service;

pub use claims::*;
pub use errors::*;
pub use keys::*;
pub use service::*;

pub use ed25519_dalek::{SigningKey, VerifyingKey};
