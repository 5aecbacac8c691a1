//! Coarse role permissions
//!
//! These answer "may this role ever do this kind of thing". The precise
//! answer for status changes still comes from the transition table, which
//! also checks the current status and the guards.

use crate::transition_table::{Trigger, TRANSITIONS};
use convention_types::{ConventionStatus, Role};
use serde::{Deserialize, Serialize};

/// Kind of operation requested through a token or credential
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Sign,
    EditDraft,
    Transition(ConventionStatus),
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Read => f.write_str("read"),
            Action::Sign => f.write_str("sign"),
            Action::EditDraft => f.write_str("edit draft"),
            Action::Transition(to) => write!(f, "transition to {to}"),
        }
    }
}

/// Whether `role` is ever allowed to perform `action`
pub fn role_may(role: Role, action: Action) -> bool {
    match action {
        Action::Read => true,
        Action::Sign => role.is_signatory_role(),
        Action::EditDraft => matches!(
            role,
            Role::Beneficiary
                | Role::LegalRepresentative
                | Role::EstablishmentRepresentative
                | Role::Counsellor
                | Role::Validator
        ),
        Action::Transition(to) => TRANSITIONS.iter().any(|rule| {
            rule.to == to && matches!(rule.trigger, Trigger::Roles(roles) if roles.contains(&role))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tutor_is_read_only() {
        let tutor = Role::EstablishmentTutor;
        assert!(role_may(tutor, Action::Read));
        assert!(!role_may(tutor, Action::Sign));
        assert!(!role_may(tutor, Action::EditDraft));
        for status in ConventionStatus::ALL {
            assert!(!role_may(tutor, Action::Transition(status)));
        }
    }

    #[test]
    fn test_only_signatory_roles_sign() {
        let signers: Vec<_> = Role::ALL
            .into_iter()
            .filter(|role| role_may(*role, Action::Sign))
            .collect();
        assert_eq!(
            signers,
            vec![
                Role::Beneficiary,
                Role::LegalRepresentative,
                Role::EstablishmentRepresentative
            ]
        );
    }

    #[test]
    fn test_transition_permissions_follow_table() {
        let accept = Action::Transition(ConventionStatus::AcceptedByCounsellor);
        assert!(role_may(Role::Counsellor, accept));
        assert!(!role_may(Role::Validator, accept));
        assert!(role_may(Role::BackofficeAdmin, Action::Transition(ConventionStatus::Cancelled)));
        assert!(!role_may(Role::Counsellor, Action::Transition(ConventionStatus::Cancelled)));
        // System-only edges are never available to a role.
        for role in Role::ALL {
            assert!(!role_may(role, Action::Transition(ConventionStatus::InReview)));
            assert!(!role_may(role, Action::Transition(ConventionStatus::PartiallySigned)));
        }
    }
}
