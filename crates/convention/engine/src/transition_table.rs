//! The transition graph, as data
//!
//! Each rule names its source states, its target, who may trigger it and
//! the guard that must hold on the aggregate. A `(from, to)` pair matches at
//! most one rule.

use convention_types::{ConventionStatus, Role};
use ConventionStatus::*;

/// Who may trigger an edge
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Any of the listed roles
    Roles(&'static [Role]),
    /// Only the system, as a consequence of signature accumulation
    System,
}

/// Condition checked against the aggregate before an edge is taken
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guard {
    None,
    /// The content passes the full validation schema
    ValidContent,
    /// At least one signatory signed, but not all of them
    PartiallySigned,
    /// Every signatory signed
    FullySigned,
    /// A non-empty justification accompanies the request
    Justification,
}

/// One edge family of the transition graph
#[derive(Clone, Copy, Debug)]
pub struct TransitionRule {
    pub from: &'static [ConventionStatus],
    pub to: ConventionStatus,
    pub trigger: Trigger,
    pub guard: Guard,
}

impl TransitionRule {
    pub fn matches(&self, from: ConventionStatus, to: ConventionStatus) -> bool {
        self.to == to && self.from.contains(&from)
    }
}

const NON_TERMINAL: &[ConventionStatus] = &[
    Draft,
    ReadyToSign,
    PartiallySigned,
    InReview,
    AcceptedByCounsellor,
    AcceptedByValidator,
];

/// The complete lifecycle graph
pub const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        from: &[Draft],
        to: ReadyToSign,
        trigger: Trigger::Roles(&[
            Role::Beneficiary,
            Role::EstablishmentRepresentative,
            Role::Counsellor,
        ]),
        guard: Guard::ValidContent,
    },
    TransitionRule {
        from: &[ReadyToSign],
        to: PartiallySigned,
        trigger: Trigger::System,
        guard: Guard::PartiallySigned,
    },
    TransitionRule {
        from: &[ReadyToSign, PartiallySigned],
        to: InReview,
        trigger: Trigger::System,
        guard: Guard::FullySigned,
    },
    TransitionRule {
        from: &[InReview],
        to: AcceptedByCounsellor,
        trigger: Trigger::Roles(&[Role::Counsellor]),
        guard: Guard::None,
    },
    TransitionRule {
        from: &[AcceptedByCounsellor],
        to: AcceptedByValidator,
        trigger: Trigger::Roles(&[Role::Validator]),
        guard: Guard::None,
    },
    TransitionRule {
        from: &[AcceptedByValidator],
        to: Validated,
        trigger: Trigger::Roles(&[Role::Validator, Role::BackofficeAdmin]),
        guard: Guard::None,
    },
    // Modification request: clears signatures and bumps the token version.
    TransitionRule {
        from: &[
            Draft,
            ReadyToSign,
            PartiallySigned,
            InReview,
            AcceptedByCounsellor,
        ],
        to: Draft,
        trigger: Trigger::Roles(&[Role::Counsellor, Role::Validator]),
        guard: Guard::Justification,
    },
    TransitionRule {
        from: &[InReview, AcceptedByCounsellor, AcceptedByValidator],
        to: Rejected,
        trigger: Trigger::Roles(&[Role::Counsellor, Role::Validator]),
        guard: Guard::Justification,
    },
    TransitionRule {
        from: NON_TERMINAL,
        to: Cancelled,
        trigger: Trigger::Roles(&[Role::BackofficeAdmin]),
        guard: Guard::Justification,
    },
];

/// Find the rule for an edge, if the edge exists
pub fn find_rule(from: ConventionStatus, to: ConventionStatus) -> Option<&'static TransitionRule> {
    TRANSITIONS.iter().find(|rule| rule.matches(from, to))
}

/// Every edge of the graph as `(from, to)` pairs
pub fn edges() -> impl Iterator<Item = (ConventionStatus, ConventionStatus)> {
    TRANSITIONS
        .iter()
        .flat_map(|rule| rule.from.iter().map(move |from| (*from, rule.to)))
}
