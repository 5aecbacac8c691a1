use serde::{Deserialize, Serialize};

/// Lifecycle state of a convention
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConventionStatus {
    Draft,
    ReadyToSign,
    PartiallySigned,
    InReview,
    AcceptedByCounsellor,
    AcceptedByValidator,
    Validated,
    Rejected,
    Cancelled,
}

impl ConventionStatus {
    pub const ALL: [ConventionStatus; 9] = [
        ConventionStatus::Draft,
        ConventionStatus::ReadyToSign,
        ConventionStatus::PartiallySigned,
        ConventionStatus::InReview,
        ConventionStatus::AcceptedByCounsellor,
        ConventionStatus::AcceptedByValidator,
        ConventionStatus::Validated,
        ConventionStatus::Rejected,
        ConventionStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConventionStatus::Draft => "DRAFT",
            ConventionStatus::ReadyToSign => "READY_TO_SIGN",
            ConventionStatus::PartiallySigned => "PARTIALLY_SIGNED",
            ConventionStatus::InReview => "IN_REVIEW",
            ConventionStatus::AcceptedByCounsellor => "ACCEPTED_BY_COUNSELLOR",
            ConventionStatus::AcceptedByValidator => "ACCEPTED_BY_VALIDATOR",
            ConventionStatus::Validated => "VALIDATED",
            ConventionStatus::Rejected => "REJECTED",
            ConventionStatus::Cancelled => "CANCELLED",
        }
    }

    /// Terminal states have no outgoing edges
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConventionStatus::Validated | ConventionStatus::Rejected | ConventionStatus::Cancelled
        )
    }

    /// The window in which signatories may sign
    pub fn accepts_signatures(&self) -> bool {
        matches!(
            self,
            ConventionStatus::ReadyToSign | ConventionStatus::PartiallySigned
        )
    }
}

impl std::fmt::Display for ConventionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown convention status: {0}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for ConventionStatus {
    type Err = UnknownStatus;

    /// Accepts `READY_TO_SIGN` as well as `ready-to-sign`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        ConventionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
