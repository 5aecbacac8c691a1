//! Authorization guard
//!
//! Turns an inbound token into an [`AuthorizedContext`] or a typed
//! [`AuthError`]. The order matters: the signature is checked before
//! anything is loaded, then freshness against the stored `token_version`,
//! then the coarse role permission.

use crate::AuthError;
use chrono::{DateTime, Utc};
use convention_engine::{role_may, Action};
use convention_storage::{ConventionRepository, Versioned};
use convention_token::TokenVerifier;
use convention_types::{ConventionAggregate, ConventionId, Role};
use std::sync::Arc;

/// Who is acting, on which convention, as read at authorization time
#[derive(Debug, Clone)]
pub struct AuthorizedContext {
    role: Role,
    subject: Option<String>,
    expires_at: DateTime<Utc>,
    snapshot: Versioned,
}

impl AuthorizedContext {
    pub fn convention_id(&self) -> &ConventionId {
        &self.snapshot.aggregate.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Administrator identifier, for backoffice contexts
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// The aggregate as loaded during authorization
    pub fn aggregate(&self) -> &ConventionAggregate {
        &self.snapshot.aggregate
    }

    /// Persistence version of [`AuthorizedContext::aggregate`]
    pub fn version(&self) -> u64 {
        self.snapshot.version
    }

    pub(crate) fn snapshot(&self) -> Versioned {
        self.snapshot.clone()
    }
}

/// Verifies tokens and checks role permissions
#[derive(Clone)]
pub struct AuthorizationGuard {
    verifier: TokenVerifier,
    repository: Arc<dyn ConventionRepository>,
}

impl AuthorizationGuard {
    pub fn new(verifier: TokenVerifier, repository: Arc<dyn ConventionRepository>) -> Self {
        Self {
            verifier,
            repository,
        }
    }

    pub async fn authorize(
        &self,
        token: &str,
        action: Action,
    ) -> Result<AuthorizedContext, AuthError> {
        self.authorize_at(token, action, Utc::now()).await
    }

    pub async fn authorize_at(
        &self,
        token: &str,
        action: Action,
        now: DateTime<Utc>,
    ) -> Result<AuthorizedContext, AuthError> {
        let claims = self.verifier.verify_signature(token).map_err(|err| {
            tracing::warn!(error = %err, "capability token rejected");
            err
        })?;
        let snapshot = self.repository.load(claims.convention_id()).await?;
        let grant = claims
            .check_freshness(snapshot.aggregate.token_version, now)
            .map_err(|err| {
                tracing::warn!(
                    convention_id = %snapshot.aggregate.id,
                    error = %err,
                    "capability token no longer fresh"
                );
                err
            })?;

        ensure_permitted(&snapshot.aggregate.id, grant.role, action)?;

        Ok(AuthorizedContext {
            role: grant.role,
            subject: None,
            expires_at: grant.expires_at,
            snapshot,
        })
    }

    /// Authorize an administrator on a given convention
    pub async fn authorize_backoffice(
        &self,
        credential: &str,
        convention_id: &ConventionId,
        action: Action,
    ) -> Result<AuthorizedContext, AuthError> {
        let claims = self.verifier.verify_backoffice(credential).map_err(|err| {
            tracing::warn!(error = %err, "backoffice credential rejected");
            err
        })?;
        let snapshot = self.repository.load(convention_id).await?;
        ensure_permitted(convention_id, Role::BackofficeAdmin, action)?;

        tracing::debug!(%convention_id, subject = %claims.sub, %action, "backoffice access");
        Ok(AuthorizedContext {
            role: Role::BackofficeAdmin,
            expires_at: claims.expires_at(),
            subject: Some(claims.sub),
            snapshot,
        })
    }
}

fn ensure_permitted(
    convention_id: &ConventionId,
    role: Role,
    action: Action,
) -> Result<(), AuthError> {
    if role_may(role, action) {
        return Ok(());
    }
    tracing::warn!(%convention_id, %role, %action, "operation denied");
    Err(AuthError::Forbidden { role, action })
}
