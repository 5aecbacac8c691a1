//! Convention use cases
//!
//! Each operation is one read-modify-write of a single aggregate. The
//! domain computation runs against the snapshot read during authorization;
//! if the save loses a race, the aggregate is reloaded and the computation
//! re-run, up to `concurrency.max_save_attempts` times.

use crate::{
    AgencyContacts, AgencyDirectory, AuthError, AuthorizationGuard, AuthorizedContext, IssuedLink,
    LinkBuilder, MagicLinkMailer, MagicLinkMessage, NotificationPort, ServiceConfig, ServiceError,
    ServiceResult,
};
use chrono::{DateTime, Utc};
use convention_engine::{
    Action, SignatureTracker, StatusTransition, TransitionEngine, TransitionRequest,
};
use convention_storage::{ConventionRepository, Versioned};
use convention_token::{BackofficeCredential, TokenError, TokenService};
use convention_types::{
    Actor, AgencyId, ConventionAggregate, ConventionContent, ConventionId, ConventionStatus, Role,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outbound collaborators of the service
#[derive(Clone)]
pub struct ServicePorts {
    pub notifications: Arc<dyn NotificationPort>,
    pub mailer: Arc<dyn MagicLinkMailer>,
    pub agencies: Arc<dyn AgencyDirectory>,
}

/// Entry point for every collaborator-facing operation
pub struct ConventionService {
    config: ServiceConfig,
    tokens: TokenService,
    guard: AuthorizationGuard,
    repository: Arc<dyn ConventionRepository>,
    ports: ServicePorts,
    engine: TransitionEngine,
    tracker: SignatureTracker,
    links: LinkBuilder,
}

impl ConventionService {
    pub fn new(
        config: ServiceConfig,
        tokens: TokenService,
        repository: Arc<dyn ConventionRepository>,
        ports: ServicePorts,
    ) -> Self {
        let guard = AuthorizationGuard::new(tokens.verifier().clone(), repository.clone());
        let engine = TransitionEngine::new();
        Self {
            links: LinkBuilder::new(&config.links),
            config,
            tokens,
            guard,
            repository,
            ports,
            engine,
            tracker: SignatureTracker::new(engine),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn guard(&self) -> &AuthorizationGuard {
        &self.guard
    }

    // ── Creation and drafts ─────────────────────────────────────────────

    /// Create a convention in `DRAFT`
    pub async fn create_convention(
        &self,
        agency_id: AgencyId,
        content: ConventionContent,
    ) -> ServiceResult<ConventionAggregate> {
        content.validate()?;
        let aggregate = ConventionAggregate::new_draft(
            ConventionId::generate(),
            agency_id,
            content,
            Utc::now(),
        );
        self.repository.create(aggregate.clone()).await?;

        tracing::info!(
            convention_id = %aggregate.id,
            agency_id = %aggregate.agency_id,
            signatories = aggregate.signatories.len(),
            "convention created"
        );
        Ok(aggregate)
    }

    /// Replace the content of a draft. Every outstanding link goes stale.
    pub async fn update_draft(
        &self,
        context: &AuthorizedContext,
        content: ConventionContent,
    ) -> ServiceResult<ConventionAggregate> {
        require_role_may(context, Action::EditDraft)?;
        content.validate()?;
        let now = Utc::now();

        let (aggregate, ()) = self
            .save_with_retry(context.snapshot(), |mut aggregate| {
                aggregate.edit_content(content.clone(), now)?;
                Ok((aggregate, ()))
            })
            .await?;

        tracing::info!(
            convention_id = %aggregate.id,
            role = %context.role(),
            token_version = aggregate.token_version,
            "draft updated"
        );
        Ok(aggregate)
    }

    // ── Links ───────────────────────────────────────────────────────────

    /// Issue one link per role at the current `token_version`.
    ///
    /// Signatories, counsellor and validator always get one; the
    /// establishment tutor gets a read-only link when present. Calling this
    /// again re-issues every link.
    pub async fn issue_initial_links(
        &self,
        convention_id: &ConventionId,
    ) -> ServiceResult<BTreeMap<Role, IssuedLink>> {
        let Versioned { aggregate, .. } = self.repository.load(convention_id).await?;
        let contacts = self.agency_contacts(&aggregate.agency_id).await?;
        let now = Utc::now();

        let mut roles: Vec<Role> = aggregate.signatories.iter().map(|s| s.role).collect();
        if aggregate.content.establishment_tutor.is_some() {
            roles.push(Role::EstablishmentTutor);
        }
        roles.extend([Role::Counsellor, Role::Validator]);

        let mut links = BTreeMap::new();
        for role in roles {
            let link = self.issue_link(&aggregate, &contacts, role, now)?;
            links.insert(role, link);
        }

        tracing::info!(
            %convention_id,
            token_version = aggregate.token_version,
            links = links.len(),
            "magic links issued"
        );
        Ok(links)
    }

    /// Email a fresh link to the address on file for the role of an expired
    /// or stale token.
    ///
    /// The token's signature must still verify. The requester is not
    /// re-authenticated: the link only ever goes to the stored address.
    pub async fn request_renewal(&self, expired_token: &str) -> ServiceResult<()> {
        let payload = self
            .tokens
            .decode_without_verifying(expired_token)
            .ok_or(ServiceError::RenewalRefused)?;
        let Versioned { aggregate, .. } = self.repository.load(&payload.convention_id).await?;
        let contacts = self.agency_contacts(&aggregate.agency_id).await?;

        let link = self.issue_link(&aggregate, &contacts, payload.role, Utc::now())?;
        if link.recipients.is_empty() {
            return Err(ServiceError::NoRecipient { role: payload.role });
        }

        for recipient in &link.recipients {
            let message = MagicLinkMessage {
                recipient: recipient.clone(),
                convention_id: aggregate.id.clone(),
                role: payload.role,
                url: link.url.clone(),
            };
            self.ports
                .mailer
                .send_magic_link(&message)
                .await
                .map_err(ServiceError::Delivery)?;
        }

        tracing::info!(
            convention_id = %aggregate.id,
            role = %payload.role,
            recipients = link.recipients.len(),
            "renewed link sent"
        );
        Ok(())
    }

    /// Issue a global credential for an administrator
    pub fn issue_backoffice_credential(
        &self,
        subject: impl Into<String>,
    ) -> ServiceResult<BackofficeCredential> {
        Ok(self
            .tokens
            .issue_backoffice(subject, self.config.links.backoffice_ttl()?)?)
    }

    // ── Authorization ───────────────────────────────────────────────────

    pub async fn verify_and_authorize(
        &self,
        token: &str,
        action: Action,
    ) -> Result<AuthorizedContext, AuthError> {
        self.guard.authorize(token, action).await
    }

    pub async fn verify_and_authorize_backoffice(
        &self,
        credential: &str,
        convention_id: &ConventionId,
        action: Action,
    ) -> Result<AuthorizedContext, AuthError> {
        self.guard
            .authorize_backoffice(credential, convention_id, action)
            .await
    }

    // ── Lifecycle operations ────────────────────────────────────────────

    pub fn read(&self, context: &AuthorizedContext) -> ServiceResult<ConventionAggregate> {
        require_role_may(context, Action::Read)?;
        Ok(context.aggregate().clone())
    }

    /// Record the signature of the context's role.
    ///
    /// `confirmed_email` is the address the signer confirmed out of band;
    /// it must match the signatory on file.
    pub async fn sign(
        &self,
        context: &AuthorizedContext,
        confirmed_email: &str,
    ) -> ServiceResult<ConventionAggregate> {
        require_role_may(context, Action::Sign)?;
        let role = context.role();
        let now = Utc::now();

        let (aggregate, status_change) = self
            .save_with_retry(context.snapshot(), |aggregate| {
                if let Some(signatory) = aggregate.signatory(role) {
                    if !signatory.has_email(confirmed_email) {
                        tracing::warn!(
                            convention_id = %aggregate.id,
                            %role,
                            "signer identity mismatch"
                        );
                        return Err(ServiceError::IdentityMismatch { role });
                    }
                }
                let outcome = self.tracker.record_signature(aggregate, role, now)?;
                Ok((outcome.aggregate, outcome.status_change))
            })
            .await?;

        self.notify_signature(&aggregate.id, role).await;
        if let Some(change) = status_change {
            self.notify_status(&aggregate.id, change).await;
        }
        Ok(aggregate)
    }

    /// Request a status change on behalf of the context's role
    pub async fn transition(
        &self,
        context: &AuthorizedContext,
        to: ConventionStatus,
        justification: Option<&str>,
    ) -> ServiceResult<ConventionAggregate> {
        require_role_may(context, Action::Transition(to))?;
        let request = TransitionRequest {
            to,
            actor: Actor::Role(context.role()),
            justification: justification.map(str::to_string),
        };
        let now = Utc::now();

        let (aggregate, change) = self
            .save_with_retry(context.snapshot(), |mut aggregate| {
                let change = self.engine.apply(&mut aggregate, request.clone(), now)?;
                Ok((aggregate, change))
            })
            .await?;

        tracing::info!(
            convention_id = %aggregate.id,
            from = %change.from,
            to = %change.to,
            role = %context.role(),
            subject = context.subject().unwrap_or("-"),
            "status changed"
        );
        self.notify_status(&aggregate.id, change).await;
        Ok(aggregate)
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Run `step` against `snapshot` and save, reloading and re-running on
    /// concurrent modification.
    ///
    /// A reload that shows a content edit or a role-requested status change
    /// since `snapshot` ends the loop with a stale token error: the caller's
    /// link no longer covers the aggregate it would act on.
    async fn save_with_retry<T, F>(
        &self,
        snapshot: Versioned,
        mut step: F,
    ) -> ServiceResult<(ConventionAggregate, T)>
    where
        F: FnMut(ConventionAggregate) -> ServiceResult<(ConventionAggregate, T)>,
    {
        let max_attempts = self.config.concurrency.max_save_attempts.max(1);
        let id = snapshot.aggregate.id.clone();
        let token_version = snapshot.aggregate.token_version;
        let history_len = snapshot.aggregate.status_history.len();
        let mut snapshot = snapshot;
        let mut attempt = 1;

        loop {
            let (aggregate, outcome) = step(snapshot.aggregate)?;
            match self.repository.save(aggregate.clone(), snapshot.version).await {
                Ok(_) => return Ok((aggregate, outcome)),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    tracing::warn!(
                        convention_id = %id,
                        attempt,
                        error = %err,
                        "save conflict, retrying"
                    );
                    attempt += 1;
                    snapshot = self.repository.load(&id).await?;
                    if snapshot.aggregate.superseded_since(token_version, history_len) {
                        tracing::warn!(
                            convention_id = %id,
                            token_version,
                            current_version = snapshot.aggregate.token_version,
                            "convention changed under the caller, refusing retry"
                        );
                        return Err(AuthError::Token(TokenError::Stale {
                            token_version,
                            current_version: snapshot.aggregate.token_version,
                        })
                        .into());
                    }
                }
                Err(err) if err.is_retryable() => {
                    tracing::warn!(
                        convention_id = %id,
                        attempts = attempt,
                        "save conflict, giving up"
                    );
                    return Err(ServiceError::Conflict {
                        id,
                        attempts: attempt,
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn issue_link(
        &self,
        aggregate: &ConventionAggregate,
        contacts: &AgencyContacts,
        role: Role,
        now: DateTime<Utc>,
    ) -> ServiceResult<IssuedLink> {
        let token = self.tokens.issue_at(
            aggregate.id.clone(),
            role,
            aggregate.token_version,
            self.config.links.ttl_for(role)?,
            now,
        )?;
        Ok(IssuedLink {
            role,
            url: self.links.url(&token),
            recipients: self.recipients(aggregate, contacts, role),
            expires_at: token.payload().expires_at(),
        })
    }

    fn recipients(
        &self,
        aggregate: &ConventionAggregate,
        contacts: &AgencyContacts,
        role: Role,
    ) -> Vec<String> {
        if !role.is_agency_role() {
            return aggregate
                .contact_email(role)
                .map(|email| vec![email.to_string()])
                .unwrap_or_default();
        }
        let mut emails = contacts.emails_for(role).to_vec();
        if role == Role::Counsellor && self.config.features.pe_connect_advisor_links {
            if let Some(advisor) = &aggregate.content.federated_advisor {
                if !emails.iter().any(|e| e.eq_ignore_ascii_case(&advisor.email)) {
                    emails.push(advisor.email.clone());
                }
            }
        }
        emails
    }

    async fn agency_contacts(&self, agency_id: &AgencyId) -> ServiceResult<AgencyContacts> {
        self.ports
            .agencies
            .agency_contacts(agency_id)
            .await
            .map_err(ServiceError::Directory)
    }

    async fn notify_status(&self, convention_id: &ConventionId, change: StatusTransition) {
        if let Err(err) = self
            .ports
            .notifications
            .on_status_changed(convention_id, change.from, change.to)
            .await
        {
            tracing::warn!(%convention_id, error = %err, "status notification failed");
        }
    }

    async fn notify_signature(&self, convention_id: &ConventionId, role: Role) {
        if let Err(err) = self
            .ports
            .notifications
            .on_signature_recorded(convention_id, role)
            .await
        {
            tracing::warn!(%convention_id, error = %err, "signature notification failed");
        }
    }
}

fn require_role_may(context: &AuthorizedContext, action: Action) -> Result<(), AuthError> {
    if convention_engine::role_may(context.role(), action) {
        Ok(())
    } else {
        Err(AuthError::Forbidden {
            role: context.role(),
            action,
        })
    }
}
