//! Token payloads and verification outcomes

use crate::{TokenError, TokenResult};
use chrono::{DateTime, TimeZone, Utc};
use convention_types::{ConventionId, Role};
use serde::{Deserialize, Serialize};

/// Payload of a convention capability token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    pub convention_id: ConventionId,
    pub role: Role,
    pub token_version: u64,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

impl TokenPayload {
    pub fn issued_at(&self) -> DateTime<Utc> {
        timestamp(self.iat)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        timestamp(self.exp)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// An issued capability token: the encoded form plus its payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilityToken {
    encoded: String,
    payload: TokenPayload,
}

impl CapabilityToken {
    pub(crate) fn new(encoded: String, payload: TokenPayload) -> Self {
        Self { encoded, payload }
    }

    /// URL-safe encoded form, suitable for `?jwt=` query parameters
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    pub fn payload(&self) -> &TokenPayload {
        &self.payload
    }

    pub fn into_string(self) -> String {
        self.encoded
    }
}

impl std::fmt::Display for CapabilityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encoded)
    }
}

/// What a fully verified token grants
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grant {
    pub convention_id: ConventionId,
    pub role: Role,
    pub token_version: u64,
    pub expires_at: DateTime<Utc>,
}

/// A token whose signature has been checked but whose freshness has not.
///
/// This is how the authorization guard learns which convention to load
/// before it can compare versions. It cannot authorize anything until
/// [`SignedClaims::check_freshness`] succeeds.
#[derive(Clone, Debug)]
pub struct SignedClaims {
    payload: TokenPayload,
}

impl SignedClaims {
    pub(crate) fn new(payload: TokenPayload) -> Self {
        Self { payload }
    }

    pub fn convention_id(&self) -> &ConventionId {
        &self.payload.convention_id
    }

    pub fn role(&self) -> Role {
        self.payload.role
    }

    pub(crate) fn into_payload(self) -> TokenPayload {
        self.payload
    }

    /// Check expiry, then version
    pub fn check_freshness(self, current_version: u64, now: DateTime<Utc>) -> TokenResult<Grant> {
        if self.payload.is_expired_at(now) {
            return Err(TokenError::Expired {
                expired_at: self.payload.expires_at(),
            });
        }
        if self.payload.token_version != current_version {
            return Err(TokenError::Stale {
                token_version: self.payload.token_version,
                current_version,
            });
        }
        Ok(Grant {
            expires_at: self.payload.expires_at(),
            convention_id: self.payload.convention_id,
            role: self.payload.role,
            token_version: self.payload.token_version,
        })
    }
}

/// Payload of a backoffice credential. Not scoped to any convention.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackofficeClaims {
    /// Identifier of the administrator
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl BackofficeClaims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        timestamp(self.exp)
    }
}

/// An issued backoffice credential
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackofficeCredential {
    encoded: String,
    claims: BackofficeClaims,
}

impl BackofficeCredential {
    pub(crate) fn new(encoded: String, claims: BackofficeClaims) -> Self {
        Self { encoded, claims }
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    pub fn claims(&self) -> &BackofficeClaims {
        &self.claims
    }
}
