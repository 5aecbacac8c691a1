//! Token issuing and verification

use crate::jws::{self, BACKOFFICE_TYP, CAPABILITY_TYP};
use crate::{
    BackofficeClaims, BackofficeCredential, CapabilityToken, Grant, SignedClaims, TokenError,
    TokenPayload, TokenResult,
};
use chrono::{DateTime, Duration, Utc};
use convention_types::{ConventionId, Role};
use ed25519_dalek::{SigningKey, VerifyingKey};

/// Verifies tokens with the public key only.
///
/// Services that never issue links hold a `TokenVerifier` and no private
/// key at all.
#[derive(Clone, Debug)]
pub struct TokenVerifier {
    verifying_key: VerifyingKey,
}

impl TokenVerifier {
    pub fn new(verifying_key: VerifyingKey) -> Self {
        Self { verifying_key }
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Fully verify a capability token against the convention's current
    /// `token_version`
    pub fn verify(&self, token: &str, current_token_version: u64) -> TokenResult<Grant> {
        self.verify_at(token, current_token_version, Utc::now())
    }

    pub fn verify_at(
        &self,
        token: &str,
        current_token_version: u64,
        now: DateTime<Utc>,
    ) -> TokenResult<Grant> {
        self.verify_signature(token)?
            .check_freshness(current_token_version, now)
    }

    /// Check the signature and structure only. The returned claims must
    /// still pass [`SignedClaims::check_freshness`] before authorizing.
    pub fn verify_signature(&self, token: &str) -> TokenResult<SignedClaims> {
        let payload: TokenPayload = jws::open(&self.verifying_key, CAPABILITY_TYP, token)?;
        if !payload.role.is_convention_scoped() {
            return Err(TokenError::Malformed(format!(
                "role {} cannot appear in a convention token",
                payload.role
            )));
        }
        Ok(SignedClaims::new(payload))
    }

    /// Recover the payload of an expired or stale token for the renewal
    /// flow. Forged or malformed tokens yield `None`.
    ///
    /// Never use the result to authorize an action.
    pub fn decode_without_verifying(&self, token: &str) -> Option<TokenPayload> {
        match self.verify_signature(token) {
            Ok(claims) => Some(claims.into_payload()),
            Err(err) => {
                tracing::debug!(error = %err, "token rejected for renewal");
                None
            }
        }
    }

    pub fn verify_backoffice(&self, credential: &str) -> TokenResult<BackofficeClaims> {
        self.verify_backoffice_at(credential, Utc::now())
    }

    pub fn verify_backoffice_at(
        &self,
        credential: &str,
        now: DateTime<Utc>,
    ) -> TokenResult<BackofficeClaims> {
        let claims: BackofficeClaims = jws::open(&self.verifying_key, BACKOFFICE_TYP, credential)?;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired {
                expired_at: claims.expires_at(),
            });
        }
        Ok(claims)
    }
}

/// Issues and verifies capability tokens and backoffice credentials
#[derive(Clone, Debug)]
pub struct TokenService {
    signing_key: SigningKey,
    verifier: TokenVerifier,
}

impl TokenService {
    pub fn new(signing_key: SigningKey) -> Self {
        let verifier = TokenVerifier::new(signing_key.verifying_key());
        Self {
            signing_key,
            verifier,
        }
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.verifier.verifying_key()
    }

    /// Issue a signed token expiring `ttl` from now
    pub fn issue(
        &self,
        convention_id: ConventionId,
        role: Role,
        token_version: u64,
        ttl: Duration,
    ) -> TokenResult<CapabilityToken> {
        self.issue_at(convention_id, role, token_version, ttl, Utc::now())
    }

    pub fn issue_at(
        &self,
        convention_id: ConventionId,
        role: Role,
        token_version: u64,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> TokenResult<CapabilityToken> {
        if !role.is_convention_scoped() {
            return Err(TokenError::RoleNotConventionScoped(role));
        }
        let payload = TokenPayload {
            convention_id,
            role,
            token_version,
            iat: now.timestamp(),
            exp: expiry(now, ttl)?,
        };
        let encoded = jws::seal(&self.signing_key, CAPABILITY_TYP, &payload)?;
        Ok(CapabilityToken::new(encoded, payload))
    }

    pub fn verify(&self, token: &str, current_token_version: u64) -> TokenResult<Grant> {
        self.verifier.verify(token, current_token_version)
    }

    pub fn verify_at(
        &self,
        token: &str,
        current_token_version: u64,
        now: DateTime<Utc>,
    ) -> TokenResult<Grant> {
        self.verifier.verify_at(token, current_token_version, now)
    }

    pub fn verify_signature(&self, token: &str) -> TokenResult<SignedClaims> {
        self.verifier.verify_signature(token)
    }

    pub fn decode_without_verifying(&self, token: &str) -> Option<TokenPayload> {
        self.verifier.decode_without_verifying(token)
    }

    /// Issue a global backoffice credential for an administrator
    pub fn issue_backoffice(
        &self,
        subject: impl Into<String>,
        ttl: Duration,
    ) -> TokenResult<BackofficeCredential> {
        self.issue_backoffice_at(subject, ttl, Utc::now())
    }

    pub fn issue_backoffice_at(
        &self,
        subject: impl Into<String>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> TokenResult<BackofficeCredential> {
        let claims = BackofficeClaims {
            sub: subject.into(),
            iat: now.timestamp(),
            exp: expiry(now, ttl)?,
        };
        let encoded = jws::seal(&self.signing_key, BACKOFFICE_TYP, &claims)?;
        Ok(BackofficeCredential::new(encoded, claims))
    }

    pub fn verify_backoffice(&self, credential: &str) -> TokenResult<BackofficeClaims> {
        self.verifier.verify_backoffice(credential)
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> TokenResult<i64> {
    now.checked_add_signed(ttl)
        .map(|at| at.timestamp())
        .ok_or(TokenError::LifetimeOutOfRange {
            ttl_secs: ttl.num_seconds(),
        })
}
