//! End-to-end lifecycle scenarios through the service layer

mod common;

use common::{token_from_url, World, AGENCY, COUNSELLOR, VALIDATOR};
use convention_engine::{Action, SignatureError, TransitionError};
use convention_service::{
    AuthError, NotificationEvent, RecordingMailer, RecordingNotifier, ServiceConfig, ServiceError,
};
use convention_storage::{ConventionRepository, InMemoryConventionRepository};
use convention_token::{TokenError, TokenService};
use convention_types::{
    fixtures, AgencyId, AggregateError, Contact, ConventionAggregate, ConventionContent,
    ConventionStatus, Role,
};
use std::sync::Arc;

fn agency() -> AgencyId {
    AgencyId::new(AGENCY)
}

#[tokio::test]
async fn test_full_lifecycle_to_validated() {
    let world = World::new();
    let created = world
        .service
        .create_convention(agency(), fixtures::adult_content())
        .await
        .unwrap();
    assert_eq!(created.status, ConventionStatus::Draft);
    assert_eq!(created.token_version, 0);

    let links = world.service.issue_initial_links(&created.id).await.unwrap();
    assert_eq!(
        links.keys().copied().collect::<Vec<_>>(),
        vec![
            Role::Beneficiary,
            Role::EstablishmentRepresentative,
            Role::EstablishmentTutor,
            Role::Counsellor,
            Role::Validator,
        ]
    );
    assert_eq!(links[&Role::Counsellor].recipients, vec![COUNSELLOR.to_string()]);
    assert_eq!(links[&Role::Validator].recipients, vec![VALIDATOR.to_string()]);
    assert_eq!(
        links[&Role::Beneficiary].recipients,
        vec!["jeanne@example.org".to_string()]
    );

    // Submit for signature.
    let beneficiary = token_from_url(&links[&Role::Beneficiary].url);
    let context = world
        .service
        .verify_and_authorize(
            &beneficiary,
            Action::Transition(ConventionStatus::ReadyToSign),
        )
        .await
        .unwrap();
    let ready = world
        .service
        .transition(&context, ConventionStatus::ReadyToSign, None)
        .await
        .unwrap();
    assert_eq!(ready.status, ConventionStatus::ReadyToSign);

    // Both signatures, each with a link at the current version.
    let tokens = world.tokens_for(&ready).await;
    let context = world
        .service
        .verify_and_authorize(&tokens[&Role::Beneficiary], Action::Sign)
        .await
        .unwrap();
    let partially = world
        .service
        .sign(&context, "Jeanne@Example.org")
        .await
        .unwrap();
    assert_eq!(partially.status, ConventionStatus::PartiallySigned);

    let tokens = world.tokens_for(&partially).await;
    let context = world
        .service
        .verify_and_authorize(&tokens[&Role::EstablishmentRepresentative], Action::Sign)
        .await
        .unwrap();
    let in_review = world
        .service
        .sign(&context, "paul@boulangerie.fr")
        .await
        .unwrap();
    assert_eq!(in_review.status, ConventionStatus::InReview);
    assert!(in_review.is_fully_signed());

    // Agency approvals.
    let tokens = world.tokens_for(&in_review).await;
    let context = world
        .service
        .verify_and_authorize(
            &tokens[&Role::Counsellor],
            Action::Transition(ConventionStatus::AcceptedByCounsellor),
        )
        .await
        .unwrap();
    let accepted = world
        .service
        .transition(&context, ConventionStatus::AcceptedByCounsellor, None)
        .await
        .unwrap();

    let tokens = world.tokens_for(&accepted).await;
    let context = world
        .service
        .verify_and_authorize(
            &tokens[&Role::Validator],
            Action::Transition(ConventionStatus::AcceptedByValidator),
        )
        .await
        .unwrap();
    let accepted = world
        .service
        .transition(&context, ConventionStatus::AcceptedByValidator, None)
        .await
        .unwrap();

    let tokens = world.tokens_for(&accepted).await;
    let context = world
        .service
        .verify_and_authorize(
            &tokens[&Role::Validator],
            Action::Transition(ConventionStatus::Validated),
        )
        .await
        .unwrap();
    let validated = world
        .service
        .transition(&context, ConventionStatus::Validated, None)
        .await
        .unwrap();
    assert_eq!(validated.status, ConventionStatus::Validated);

    let trail: Vec<_> = validated
        .status_history
        .iter()
        .map(|change| change.to)
        .collect();
    assert_eq!(
        trail,
        vec![
            ConventionStatus::ReadyToSign,
            ConventionStatus::PartiallySigned,
            ConventionStatus::InReview,
            ConventionStatus::AcceptedByCounsellor,
            ConventionStatus::AcceptedByValidator,
            ConventionStatus::Validated,
        ]
    );

    let events = world.notifier.events();
    assert!(events.contains(&NotificationEvent::SignatureRecorded {
        convention_id: created.id.clone(),
        role: Role::EstablishmentRepresentative,
    }));
    assert!(events.contains(&NotificationEvent::StatusChanged {
        convention_id: created.id.clone(),
        from: ConventionStatus::AcceptedByValidator,
        to: ConventionStatus::Validated,
    }));
}

async fn ready_to_sign(world: &World, content: ConventionContent) -> ConventionAggregate {
    let created = world
        .service
        .create_convention(agency(), content)
        .await
        .unwrap();
    let tokens = world.tokens_for(&created).await;
    let context = world
        .service
        .verify_and_authorize(
            &tokens[&Role::Counsellor],
            Action::Transition(ConventionStatus::ReadyToSign),
        )
        .await
        .unwrap();
    world
        .service
        .transition(&context, ConventionStatus::ReadyToSign, None)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_second_signature_for_same_role_is_explicit_error() {
    let world = World::new();
    let ready = ready_to_sign(&world, fixtures::minor_content()).await;

    let tokens = world.tokens_for(&ready).await;
    let context = world
        .service
        .verify_and_authorize(&tokens[&Role::Beneficiary], Action::Sign)
        .await
        .unwrap();
    let signed = world
        .service
        .sign(&context, "jeanne@example.org")
        .await
        .unwrap();

    let tokens = world.tokens_for(&signed).await;
    let context = world
        .service
        .verify_and_authorize(&tokens[&Role::Beneficiary], Action::Sign)
        .await
        .unwrap();
    let err = world
        .service
        .sign(&context, "jeanne@example.org")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Signature(SignatureError::AlreadySigned {
            role: Role::Beneficiary,
            ..
        })
    ));

    let stored = world.repository.load(&ready.id).await.unwrap().aggregate;
    assert_eq!(stored.signatories, signed.signatories);
}

#[tokio::test]
async fn test_signer_identity_must_match() {
    let world = World::new();
    let ready = ready_to_sign(&world, fixtures::adult_content()).await;
    let tokens = world.tokens_for(&ready).await;
    let context = world
        .service
        .verify_and_authorize(&tokens[&Role::EstablishmentRepresentative], Action::Sign)
        .await
        .unwrap();

    let err = world
        .service
        .sign(&context, "someone.else@boulangerie.fr")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::IdentityMismatch {
            role: Role::EstablishmentRepresentative
        }
    ));
    let stored = world.repository.load(&ready.id).await.unwrap().aggregate;
    assert_eq!(stored.signed_count(), 0);
}

#[tokio::test]
async fn test_modification_request_resets_signatures_and_links() {
    let world = World::new();
    let ready = ready_to_sign(&world, fixtures::adult_content()).await;

    let tokens = world.tokens_for(&ready).await;
    let context = world
        .service
        .verify_and_authorize(&tokens[&Role::Beneficiary], Action::Sign)
        .await
        .unwrap();
    let signed = world
        .service
        .sign(&context, "jeanne@example.org")
        .await
        .unwrap();

    let tokens = world.tokens_for(&signed).await;
    let context = world
        .service
        .verify_and_authorize(
            &tokens[&Role::Validator],
            Action::Transition(ConventionStatus::Draft),
        )
        .await
        .unwrap();

    let err = world
        .service
        .transition(&context, ConventionStatus::Draft, Some("  "))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Transition(TransitionError::MissingJustification { .. })
    ));

    let draft = world
        .service
        .transition(&context, ConventionStatus::Draft, Some("wrong weekly hours"))
        .await
        .unwrap();
    assert_eq!(draft.status, ConventionStatus::Draft);
    assert_eq!(draft.signed_count(), 0);
    assert!(draft.token_version > signed.token_version);

    let err = world
        .service
        .verify_and_authorize(&tokens[&Role::EstablishmentRepresentative], Action::Sign)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Token(TokenError::Stale { .. })));
    assert!(err.is_renewable());
}

#[tokio::test]
async fn test_illegal_and_forbidden_transitions_are_typed() {
    let world = World::new();
    let ready = ready_to_sign(&world, fixtures::adult_content()).await;
    let tokens = world.tokens_for(&ready).await;

    // The validator may accept, but not from READY_TO_SIGN.
    let context = world
        .service
        .verify_and_authorize(
            &tokens[&Role::Validator],
            Action::Transition(ConventionStatus::AcceptedByValidator),
        )
        .await
        .unwrap();
    let err = world
        .service
        .transition(&context, ConventionStatus::AcceptedByValidator, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Transition(TransitionError::IllegalTransition {
            from: ConventionStatus::ReadyToSign,
            to: ConventionStatus::AcceptedByValidator,
        })
    ));

    // The beneficiary may never accept.
    let err = world
        .service
        .verify_and_authorize(
            &tokens[&Role::Beneficiary],
            Action::Transition(ConventionStatus::AcceptedByCounsellor),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden { role: Role::Beneficiary, .. }));
}

#[tokio::test]
async fn test_tutor_link_is_read_only() {
    let world = World::new();
    let ready = ready_to_sign(&world, fixtures::adult_content()).await;
    let tokens = world.tokens_for(&ready).await;
    let tutor = &tokens[&Role::EstablishmentTutor];

    let context = world
        .service
        .verify_and_authorize(tutor, Action::Read)
        .await
        .unwrap();
    assert_eq!(world.service.read(&context).unwrap().id, ready.id);

    let err = world
        .service
        .verify_and_authorize(tutor, Action::Sign)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden { .. }));
}

#[tokio::test]
async fn test_backoffice_cancels_inactive_convention() {
    let world = World::new();
    let ready = ready_to_sign(&world, fixtures::adult_content()).await;
    let credential = world.service.issue_backoffice_credential("admin-7").unwrap();

    let context = world
        .service
        .verify_and_authorize_backoffice(
            credential.as_str(),
            &ready.id,
            Action::Transition(ConventionStatus::Cancelled),
        )
        .await
        .unwrap();
    let cancelled = world
        .service
        .transition(&context, ConventionStatus::Cancelled, Some("inactive for 6 months"))
        .await
        .unwrap();
    assert_eq!(cancelled.status, ConventionStatus::Cancelled);
    assert_eq!(
        cancelled.last_status_change().unwrap().justification.as_deref(),
        Some("inactive for 6 months")
    );

    // Terminal: nothing leaves CANCELLED.
    let context = world
        .service
        .verify_and_authorize_backoffice(
            credential.as_str(),
            &ready.id,
            Action::Transition(ConventionStatus::Validated),
        )
        .await
        .unwrap();
    let err = world
        .service
        .transition(&context, ConventionStatus::Validated, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Transition(TransitionError::IllegalTransition { .. })
    ));
}

#[tokio::test]
async fn test_notification_failure_does_not_roll_back() {
    let world = World::build(
        ServiceConfig::development(),
        Arc::new(InMemoryConventionRepository::new()),
        Arc::new(RecordingNotifier::failing()),
        Arc::new(RecordingMailer::new()),
    );
    let ready = ready_to_sign(&world, fixtures::adult_content()).await;

    let stored = world.repository.load(&ready.id).await.unwrap().aggregate;
    assert_eq!(stored.status, ConventionStatus::ReadyToSign);
    assert_eq!(world.notifier.events().len(), 1);
}

#[tokio::test]
async fn test_renewal_sends_to_address_on_file() {
    let world = World::new();
    let ready = ready_to_sign(&world, fixtures::adult_content()).await;
    let tokens = world.tokens_for(&ready).await;

    // Beneficiary signs; the establishment representative's link goes stale.
    let context = world
        .service
        .verify_and_authorize(&tokens[&Role::Beneficiary], Action::Sign)
        .await
        .unwrap();
    world
        .service
        .sign(&context, "jeanne@example.org")
        .await
        .unwrap();
    let stale = &tokens[&Role::EstablishmentRepresentative];
    assert!(world
        .service
        .verify_and_authorize(stale, Action::Sign)
        .await
        .unwrap_err()
        .is_renewable());

    world.service.request_renewal(stale).await.unwrap();
    let sent = world.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "paul@boulangerie.fr");
    assert_eq!(sent[0].role, Role::EstablishmentRepresentative);

    let fresh = token_from_url(&sent[0].url);
    let context = world
        .service
        .verify_and_authorize(&fresh, Action::Sign)
        .await
        .unwrap();
    let in_review = world
        .service
        .sign(&context, "paul@boulangerie.fr")
        .await
        .unwrap();
    assert_eq!(in_review.status, ConventionStatus::InReview);
}

#[tokio::test]
async fn test_renewal_refuses_forged_tokens() {
    let world = World::new();
    let created = world
        .service
        .create_convention(agency(), fixtures::adult_content())
        .await
        .unwrap();
    let forged = TokenService::new(convention_token::generate_signing_key())
        .issue(created.id.clone(), Role::Beneficiary, 0, chrono::Duration::hours(1))
        .unwrap()
        .into_string();

    let err = world.service.request_renewal(&forged).await.unwrap_err();
    assert!(matches!(err, ServiceError::RenewalRefused));
    assert!(world.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_renewal_delivery_failure_is_surfaced() {
    let world = World::build(
        ServiceConfig::development(),
        Arc::new(InMemoryConventionRepository::new()),
        Arc::new(RecordingNotifier::new()),
        Arc::new(RecordingMailer::failing()),
    );
    let created = world
        .service
        .create_convention(agency(), fixtures::adult_content())
        .await
        .unwrap();
    let tokens = world.tokens_for(&created).await;

    let err = world
        .service
        .request_renewal(&tokens[&Role::Beneficiary])
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Delivery(_)));
}

#[tokio::test]
async fn test_draft_edits_bump_version_and_lock_after_submission() {
    let world = World::new();
    let created = world
        .service
        .create_convention(agency(), fixtures::adult_content())
        .await
        .unwrap();
    let tokens = world.tokens_for(&created).await;

    let context = world
        .service
        .verify_and_authorize(&tokens[&Role::EstablishmentRepresentative], Action::EditDraft)
        .await
        .unwrap();
    let mut content = fixtures::adult_content();
    content.weekly_hours = 28;
    let edited = world.service.update_draft(&context, content).await.unwrap();
    assert_eq!(edited.content.weekly_hours, 28);
    assert_eq!(edited.token_version, created.token_version + 1);

    // The tutor cannot edit.
    let tokens = world.tokens_for(&edited).await;
    assert!(matches!(
        world
            .service
            .verify_and_authorize(&tokens[&Role::EstablishmentTutor], Action::EditDraft)
            .await,
        Err(AuthError::Forbidden { .. })
    ));

    // Once submitted, the content is locked.
    let context = world
        .service
        .verify_and_authorize(
            &tokens[&Role::Beneficiary],
            Action::Transition(ConventionStatus::ReadyToSign),
        )
        .await
        .unwrap();
    let ready = world
        .service
        .transition(&context, ConventionStatus::ReadyToSign, None)
        .await
        .unwrap();
    let tokens = world.tokens_for(&ready).await;
    let context = world
        .service
        .verify_and_authorize(&tokens[&Role::Beneficiary], Action::EditDraft)
        .await
        .unwrap();
    let err = world
        .service
        .update_draft(&context, fixtures::adult_content())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Aggregate(AggregateError::ContentLocked(ConventionStatus::ReadyToSign))
    ));
}

#[tokio::test]
async fn test_invalid_content_is_rejected_at_creation() {
    let world = World::new();
    let mut content = fixtures::adult_content();
    content.siret = "123".to_string();
    content.weekly_hours = 0;

    let err = world
        .service
        .create_convention(agency(), content)
        .await
        .unwrap_err();
    match err {
        ServiceError::Content(content_error) => assert_eq!(content_error.violations.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_pe_connect_advisor_receives_counsellor_link_when_enabled() {
    let mut content = fixtures::adult_content();
    content.federated_advisor = Some(Contact::new("Marc", "Leroy", "marc.leroy@pole-emploi.fr"));

    let world = World::new();
    let created = world
        .service
        .create_convention(agency(), content.clone())
        .await
        .unwrap();
    let links = world.service.issue_initial_links(&created.id).await.unwrap();
    assert_eq!(links[&Role::Counsellor].recipients, vec![COUNSELLOR.to_string()]);

    let mut config = ServiceConfig::development();
    config.features.pe_connect_advisor_links = true;
    let world = World::build(
        config,
        Arc::new(InMemoryConventionRepository::new()),
        Arc::new(RecordingNotifier::new()),
        Arc::new(RecordingMailer::new()),
    );
    let created = world
        .service
        .create_convention(agency(), content)
        .await
        .unwrap();
    let links = world.service.issue_initial_links(&created.id).await.unwrap();
    assert_eq!(
        links[&Role::Counsellor].recipients,
        vec![
            COUNSELLOR.to_string(),
            "marc.leroy@pole-emploi.fr".to_string()
        ]
    );
}
