//! Signature accumulation
//!
//! Recording a signature is the only way `signed_at` gets set. Once a
//! signature lands, the tracker asks the [`TransitionEngine`] for the
//! automatic advancement: `PARTIALLY_SIGNED` while some signatories are
//! still pending, `IN_REVIEW` once every one of them has signed.

use crate::{
    SignatureError, SignatureResult, StatusTransition, TransitionEngine, TransitionRequest,
};
use chrono::{DateTime, Utc};
use convention_types::{ConventionAggregate, ConventionStatus, Role};

/// Result of a recorded signature
#[derive(Clone, Debug, PartialEq)]
pub struct SignatureOutcome {
    /// The updated aggregate, ready to be saved
    pub aggregate: ConventionAggregate,
    pub role: Role,
    pub signed_at: DateTime<Utc>,
    /// Set when the signature triggered an automatic status change
    pub status_change: Option<StatusTransition>,
}

/// Records signatures and drives the signature-based transitions
#[derive(Clone, Copy, Debug, Default)]
pub struct SignatureTracker {
    engine: TransitionEngine,
}

impl SignatureTracker {
    pub fn new(engine: TransitionEngine) -> Self {
        Self { engine }
    }

    /// Record the signature of `role` at `at`.
    ///
    /// The aggregate is taken by value and handed back inside the outcome,
    /// so a refused signature never leaves a half-applied copy behind.
    pub fn record_signature(
        &self,
        mut aggregate: ConventionAggregate,
        role: Role,
        at: DateTime<Utc>,
    ) -> SignatureResult<SignatureOutcome> {
        let status = aggregate.status;

        let signatory = aggregate
            .signatory_mut(role)
            .ok_or(SignatureError::SignatoryNotFound(role))?;
        if let Some(signed_at) = signatory.signed_at {
            return Err(SignatureError::AlreadySigned { role, signed_at });
        }
        if !status.accepts_signatures() {
            return Err(SignatureError::InvalidStateForSignature { status });
        }
        signatory.signed_at = Some(at);
        aggregate.updated_at = at;

        let target = if aggregate.is_fully_signed() {
            ConventionStatus::InReview
        } else {
            ConventionStatus::PartiallySigned
        };

        let status_change = if target == status {
            None
        } else {
            Some(
                self.engine
                    .apply(&mut aggregate, TransitionRequest::system(target), at)?,
            )
        };

        tracing::info!(
            convention_id = %aggregate.id,
            %role,
            signed = aggregate.signed_count(),
            total = aggregate.signatories.len(),
            status = %aggregate.status,
            "signature recorded"
        );

        Ok(SignatureOutcome {
            aggregate,
            role,
            signed_at: at,
            status_change,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convention_types::fixtures;
    use ConventionStatus::*;

    fn ready(content: convention_types::ConventionContent) -> ConventionAggregate {
        let mut agg = fixtures::draft_with(content);
        agg.apply_status_change(
            ReadyToSign,
            convention_types::Actor::Role(Role::Beneficiary),
            None,
            Utc::now(),
        );
        agg
    }

    #[test]
    fn test_first_signature_moves_to_partially_signed() {
        let tracker = SignatureTracker::default();
        let agg = ready(fixtures::adult_content());
        let version = agg.token_version;

        let outcome = tracker
            .record_signature(agg, Role::Beneficiary, Utc::now())
            .unwrap();

        assert_eq!(outcome.aggregate.status, PartiallySigned);
        assert_eq!(
            outcome.status_change,
            Some(StatusTransition {
                from: ReadyToSign,
                to: PartiallySigned
            })
        );
        assert_eq!(outcome.aggregate.token_version, version + 1);
        assert!(outcome
            .aggregate
            .signatory(Role::Beneficiary)
            .unwrap()
            .has_signed());
    }

    #[test]
    fn test_last_signature_moves_to_in_review() {
        let tracker = SignatureTracker::default();
        let agg = ready(fixtures::adult_content());

        let first = tracker
            .record_signature(agg, Role::Beneficiary, Utc::now())
            .unwrap();
        let second = tracker
            .record_signature(first.aggregate, Role::EstablishmentRepresentative, Utc::now())
            .unwrap();

        assert_eq!(second.aggregate.status, InReview);
        assert!(second.aggregate.is_fully_signed());
        assert_eq!(
            second.status_change,
            Some(StatusTransition {
                from: PartiallySigned,
                to: InReview
            })
        );
    }

    #[test]
    fn test_minor_needs_three_signatures() {
        let tracker = SignatureTracker::default();
        let mut agg = ready(fixtures::minor_content());
        assert_eq!(agg.signatories.len(), 3);

        for role in [Role::LegalRepresentative, Role::Beneficiary] {
            agg = tracker.record_signature(agg, role, Utc::now()).unwrap().aggregate;
            assert_eq!(agg.status, PartiallySigned);
        }
        let last = tracker
            .record_signature(agg, Role::EstablishmentRepresentative, Utc::now())
            .unwrap();
        assert_eq!(last.aggregate.status, InReview);
    }

    #[test]
    fn test_second_signature_in_partially_signed_keeps_status_when_pending() {
        let tracker = SignatureTracker::default();
        let agg = ready(fixtures::minor_content());
        let first = tracker
            .record_signature(agg, Role::Beneficiary, Utc::now())
            .unwrap();
        let version = first.aggregate.token_version;
        let second = tracker
            .record_signature(first.aggregate, Role::LegalRepresentative, Utc::now())
            .unwrap();
        assert_eq!(second.status_change, None);
        assert_eq!(second.aggregate.token_version, version);
    }

    #[test]
    fn test_double_signature_is_rejected() {
        let tracker = SignatureTracker::default();
        let agg = ready(fixtures::minor_content());
        let first = tracker
            .record_signature(agg, Role::Beneficiary, Utc::now())
            .unwrap();
        let signed_at = first.signed_at;

        let err = tracker
            .record_signature(first.aggregate, Role::Beneficiary, Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            SignatureError::AlreadySigned {
                role: Role::Beneficiary,
                signed_at
            }
        );
    }

    #[test]
    fn test_already_signed_reported_even_after_review() {
        let tracker = SignatureTracker::default();
        let agg = ready(fixtures::adult_content());
        let agg = tracker
            .record_signature(agg, Role::Beneficiary, Utc::now())
            .unwrap()
            .aggregate;
        let agg = tracker
            .record_signature(agg, Role::EstablishmentRepresentative, Utc::now())
            .unwrap()
            .aggregate;
        assert_eq!(agg.status, InReview);

        let err = tracker
            .record_signature(agg, Role::Beneficiary, Utc::now())
            .unwrap_err();
        assert!(matches!(err, SignatureError::AlreadySigned { .. }));
    }

    #[test]
    fn test_signature_refused_outside_signing_states() {
        let tracker = SignatureTracker::default();
        let agg = fixtures::adult_draft();
        let err = tracker
            .record_signature(agg, Role::Beneficiary, Utc::now())
            .unwrap_err();
        assert_eq!(err, SignatureError::InvalidStateForSignature { status: Draft });
    }

    #[test]
    fn test_missing_signatory() {
        let tracker = SignatureTracker::default();
        let agg = ready(fixtures::adult_content());
        for role in [Role::LegalRepresentative, Role::Counsellor, Role::EstablishmentTutor] {
            let err = tracker
                .record_signature(agg.clone(), role, Utc::now())
                .unwrap_err();
            assert_eq!(err, SignatureError::SignatoryNotFound(role));
        }
    }
}
