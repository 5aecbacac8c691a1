//! Error types for the lifecycle engine

use chrono::{DateTime, Utc};
use convention_types::{Actor, ContentError, ConventionStatus, Role};

/// A requested status change was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition {
        from: ConventionStatus,
        to: ConventionStatus,
    },

    #[error("{actor} may not trigger {from} -> {to}")]
    ForbiddenActor {
        actor: Actor,
        from: ConventionStatus,
        to: ConventionStatus,
    },

    #[error("a justification is required for {from} -> {to}")]
    MissingJustification {
        from: ConventionStatus,
        to: ConventionStatus,
    },

    #[error("guard not satisfied for {from} -> {to}: {reason}")]
    GuardNotSatisfied {
        from: ConventionStatus,
        to: ConventionStatus,
        reason: String,
    },

    #[error(transparent)]
    InvalidContent(#[from] ContentError),
}

/// A signature could not be recorded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("{role} already signed at {signed_at}")]
    AlreadySigned {
        role: Role,
        signed_at: DateTime<Utc>,
    },

    #[error("signatures are not accepted while the convention is {status}")]
    InvalidStateForSignature { status: ConventionStatus },

    #[error("no signatory with role {0} on this convention")]
    SignatoryNotFound(Role),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Result type alias for transition computations
pub type TransitionResult<T> = Result<T, TransitionError>;

/// Result type alias for signature recording
pub type SignatureResult<T> = Result<T, SignatureError>;
