//! The convention aggregate
//!
//! `ConventionAggregate` is the unit of persistence and of optimistic
//! concurrency. It applies the side effects of a status change but never
//! decides whether the change is legal; callers obtain the target status
//! from the transition engine first.

use crate::{
    AgencyId, AggregateError, ConventionContent, ConventionId, ConventionStatus, Role, Signatory,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who caused a status change
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "role", rename_all = "snake_case")]
pub enum Actor {
    /// A party acting through a token or credential
    Role(Role),
    /// Automatic advancement (signature accumulation)
    System,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Role(role) => write!(f, "{role}"),
            Actor::System => f.write_str("system"),
        }
    }
}

/// One entry of the status audit trail
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: ConventionStatus,
    pub to: ConventionStatus,
    pub actor: Actor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    pub at: DateTime<Utc>,
}

/// A convention record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConventionAggregate {
    pub id: ConventionId,
    pub status: ConventionStatus,
    pub signatories: Vec<Signatory>,
    pub content: ConventionContent,
    /// Bumped on every status change and every draft edit; embedded in
    /// capability tokens so that links issued for an older view go stale.
    pub token_version: u64,
    pub agency_id: AgencyId,
    #[serde(default)]
    pub status_history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConventionAggregate {
    /// Create a new convention in `DRAFT`
    pub fn new_draft(
        id: ConventionId,
        agency_id: AgencyId,
        content: ConventionContent,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            status: ConventionStatus::Draft,
            signatories: content.signatories(),
            content,
            token_version: 0,
            agency_id,
            status_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn signatory(&self, role: Role) -> Option<&Signatory> {
        self.signatories.iter().find(|s| s.role == role)
    }

    pub fn signatory_mut(&mut self, role: Role) -> Option<&mut Signatory> {
        self.signatories.iter_mut().find(|s| s.role == role)
    }

    pub fn signed_count(&self) -> usize {
        self.signatories.iter().filter(|s| s.has_signed()).count()
    }

    /// Every signatory has signed. An aggregate without signatories is
    /// never considered fully signed.
    pub fn is_fully_signed(&self) -> bool {
        !self.signatories.is_empty() && self.signatories.iter().all(Signatory::has_signed)
    }

    /// Whether a person changed the aggregate since it was read at
    /// `token_version` with `history_len` status changes.
    ///
    /// Automatic advances made on a signature do not count. Content edits
    /// and status changes requested by a role do.
    pub fn superseded_since(&self, token_version: u64, history_len: usize) -> bool {
        let automatic = self
            .status_history
            .iter()
            .skip(history_len)
            .filter(|change| change.actor == Actor::System)
            .count() as u64;
        self.token_version.saturating_sub(token_version) > automatic
    }

    /// Replace the draft content.
    ///
    /// Signatories are re-derived from the new content; no signature can
    /// exist in `DRAFT` so nothing is lost.
    pub fn edit_content(
        &mut self,
        content: ConventionContent,
        now: DateTime<Utc>,
    ) -> Result<(), AggregateError> {
        if self.status != ConventionStatus::Draft {
            return Err(AggregateError::ContentLocked(self.status));
        }
        self.signatories = content.signatories();
        self.content = content;
        self.token_version += 1;
        self.updated_at = now;
        Ok(())
    }

    /// Apply a status change already approved by the transition engine.
    ///
    /// Going back to `DRAFT` clears every signature.
    pub fn apply_status_change(
        &mut self,
        to: ConventionStatus,
        actor: Actor,
        justification: Option<String>,
        at: DateTime<Utc>,
    ) {
        let from = self.status;
        if to == ConventionStatus::Draft {
            for signatory in &mut self.signatories {
                signatory.signed_at = None;
            }
        }
        self.status = to;
        self.token_version += 1;
        self.updated_at = at;
        self.status_history.push(StatusChange {
            from,
            to,
            actor,
            justification,
            at,
        });
    }

    /// Email on file for a convention-side role.
    ///
    /// Agency roles are resolved through the agency directory instead and
    /// yield `None` here.
    pub fn contact_email(&self, role: Role) -> Option<&str> {
        match role {
            Role::Beneficiary | Role::LegalRepresentative | Role::EstablishmentRepresentative => {
                self.signatory(role).map(|s| s.email.as_str())
            }
            Role::EstablishmentTutor => self
                .content
                .establishment_tutor
                .as_ref()
                .map(|c| c.email.as_str()),
            Role::Counsellor | Role::Validator | Role::BackofficeAdmin => None,
        }
    }

    pub fn last_status_change(&self) -> Option<&StatusChange> {
        self.status_history.last()
    }
}
