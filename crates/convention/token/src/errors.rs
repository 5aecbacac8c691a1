//! Error types for token issuing and verification

use chrono::{DateTime, Utc};
use convention_types::Role;

/// Errors that can occur while issuing or verifying tokens.
///
/// The first four variants are the verification outcomes surfaced to
/// callers as "link invalid or expired".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },

    #[error("stale token: issued for version {token_version}, convention is at {current_version}")]
    Stale {
        token_version: u64,
        current_version: u64,
    },

    #[error("role {0} is not carried by convention links")]
    RoleNotConventionScoped(Role),

    #[error("token lifetime of {ttl_secs}s puts the expiry out of range")]
    LifetimeOutOfRange { ttl_secs: i64 },

    #[error("token encoding failed: {0}")]
    Encoding(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

impl TokenError {
    /// Whether the renewal flow can recover from this error by emailing a
    /// fresh link
    pub fn is_renewable(&self) -> bool {
        matches!(self, TokenError::Expired { .. } | TokenError::Stale { .. })
    }
}

/// Result type alias for token operations
pub type TokenResult<T> = Result<T, TokenError>;
