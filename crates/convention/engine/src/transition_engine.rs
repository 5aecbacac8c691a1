//! Transition engine: decides the next status of a convention
//!
//! The engine is pure. It receives an aggregate snapshot and a request and
//! returns the next status or a typed refusal. [`TransitionEngine::apply`]
//! is a convenience that also applies the side effects on a mutable
//! aggregate; persisting it remains the caller's job.

use crate::transition_table::{find_rule, Guard, Trigger, TRANSITIONS};
use crate::{TransitionError, TransitionResult};
use chrono::{DateTime, Utc};
use convention_types::{Actor, ConventionAggregate, ConventionStatus, Role};
use serde::{Deserialize, Serialize};

/// A requested status change
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionRequest {
    pub to: ConventionStatus,
    pub actor: Actor,
    pub justification: Option<String>,
}

impl TransitionRequest {
    pub fn by_role(role: Role, to: ConventionStatus) -> Self {
        Self {
            to,
            actor: Actor::Role(role),
            justification: None,
        }
    }

    pub fn system(to: ConventionStatus) -> Self {
        Self {
            to,
            actor: Actor::System,
            justification: None,
        }
    }

    pub fn with_justification(mut self, justification: impl Into<String>) -> Self {
        self.justification = Some(justification.into());
        self
    }

    fn justification_text(&self) -> Option<&str> {
        self.justification
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

/// A status change that was applied to an aggregate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: ConventionStatus,
    pub to: ConventionStatus,
}

/// Computes lifecycle transitions from the transition table
#[derive(Clone, Copy, Debug, Default)]
pub struct TransitionEngine;

impl TransitionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Decide the next status for `request` against the current aggregate.
    ///
    /// Checks run in order: edge exists, actor permitted, justification
    /// present, guard satisfied.
    pub fn transition(
        &self,
        aggregate: &ConventionAggregate,
        request: &TransitionRequest,
    ) -> TransitionResult<ConventionStatus> {
        let from = aggregate.status;
        let to = request.to;

        let rule = find_rule(from, to).ok_or(TransitionError::IllegalTransition { from, to })?;

        let permitted = match (rule.trigger, request.actor) {
            (Trigger::Roles(roles), Actor::Role(role)) => roles.contains(&role),
            (Trigger::System, Actor::System) => true,
            _ => false,
        };
        if !permitted {
            return Err(TransitionError::ForbiddenActor {
                actor: request.actor,
                from,
                to,
            });
        }

        match rule.guard {
            Guard::None => {}
            Guard::Justification => {
                if request.justification_text().is_none() {
                    return Err(TransitionError::MissingJustification { from, to });
                }
            }
            Guard::ValidContent => aggregate.content.validate()?,
            Guard::PartiallySigned => {
                let signed = aggregate.signed_count();
                if signed == 0 || aggregate.is_fully_signed() {
                    return Err(TransitionError::GuardNotSatisfied {
                        from,
                        to,
                        reason: format!(
                            "{signed} of {} signatories signed",
                            aggregate.signatories.len()
                        ),
                    });
                }
            }
            Guard::FullySigned => {
                if !aggregate.is_fully_signed() {
                    return Err(TransitionError::GuardNotSatisfied {
                        from,
                        to,
                        reason: format!(
                            "{} of {} signatories signed",
                            aggregate.signed_count(),
                            aggregate.signatories.len()
                        ),
                    });
                }
            }
        }

        tracing::debug!(
            convention_id = %aggregate.id,
            %from,
            %to,
            actor = %request.actor,
            "transition permitted"
        );
        Ok(to)
    }

    /// Compute the transition and apply it to the aggregate
    pub fn apply(
        &self,
        aggregate: &mut ConventionAggregate,
        request: TransitionRequest,
        at: DateTime<Utc>,
    ) -> TransitionResult<StatusTransition> {
        let from = aggregate.status;
        let to = self.transition(aggregate, &request)?;
        let justification = request.justification_text().map(str::to_string);
        aggregate.apply_status_change(to, request.actor, justification, at);
        Ok(StatusTransition { from, to })
    }

    /// Statuses reachable from `from` by `actor`, ignoring guards
    pub fn targets_for(&self, from: ConventionStatus, actor: Actor) -> Vec<ConventionStatus> {
        TRANSITIONS
            .iter()
            .filter(|rule| rule.from.contains(&from))
            .filter(|rule| match (rule.trigger, actor) {
                (Trigger::Roles(roles), Actor::Role(role)) => roles.contains(&role),
                (Trigger::System, Actor::System) => true,
                _ => false,
            })
            .map(|rule| rule.to)
            .collect()
    }
}
