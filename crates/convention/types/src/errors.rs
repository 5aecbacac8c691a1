//! Error types for the convention domain

use crate::{ContentViolation, ConventionStatus};

/// The content failed the validation schema
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("convention content is invalid: {}", format_violations(.violations))]
pub struct ContentError {
    pub violations: Vec<ContentViolation>,
}

fn format_violations(violations: &[ContentViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised by the aggregate's own invariants
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("content can only be edited in DRAFT, convention is {0}")]
    ContentLocked(ConventionStatus),
}
