//! Error types for the use-case layer

use convention_engine::{Action, SignatureError, TransitionError};
use convention_storage::RepositoryError;
use convention_token::TokenError;
use convention_types::{AggregateError, ContentError, ConventionId, Role};
use thiserror::Error;

use crate::PortError;

/// An inbound token or credential does not authorize the operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("{role} may not {action}")]
    Forbidden { role: Role, action: Action },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl AuthError {
    /// Whether the caller should be offered a fresh link
    pub fn is_renewable(&self) -> bool {
        matches!(self, AuthError::Token(err) if err.is_renewable())
    }
}

/// Errors surfaced by [`ConventionService`](crate::ConventionService)
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Optimistic concurrency retries exhausted; the caller should resubmit
    #[error("convention {id} kept changing; gave up after {attempts} attempts")]
    Conflict { id: ConventionId, attempts: u32 },

    /// The person signing is not the signatory on file for the role
    #[error("signer identity does not match the {role} on file")]
    IdentityMismatch { role: Role },

    /// The renewal request carried a token that cannot be trusted
    #[error("renewal refused: token is forged or malformed")]
    RenewalRefused,

    #[error("no recipient on file for {role}")]
    NoRecipient { role: Role },

    #[error("magic link delivery failed: {0}")]
    Delivery(PortError),

    #[error("agency directory unavailable: {0}")]
    Directory(PortError),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
