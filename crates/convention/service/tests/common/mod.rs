#![allow(dead_code)]

use convention_service::{
    AgencyContacts, ConventionService, InMemoryAgencyDirectory, RecordingMailer,
    RecordingNotifier, ServiceConfig, ServicePorts,
};
use convention_storage::{ConventionRepository, InMemoryConventionRepository};
use convention_token::TokenService;
use convention_types::{AgencyId, ConventionAggregate, Role};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const AGENCY: &str = "agency-paris-15";
pub const COUNSELLOR: &str = "conseiller@agence.fr";
pub const VALIDATOR: &str = "valideur@agence.fr";

pub struct World {
    pub service: ConventionService,
    pub tokens: TokenService,
    pub repository: Arc<dyn ConventionRepository>,
    pub notifier: Arc<RecordingNotifier>,
    pub mailer: Arc<RecordingMailer>,
}

impl World {
    pub fn new() -> Self {
        Self::build(
            ServiceConfig::development(),
            Arc::new(InMemoryConventionRepository::new()),
            Arc::new(RecordingNotifier::new()),
            Arc::new(RecordingMailer::new()),
        )
    }

    pub fn build(
        config: ServiceConfig,
        repository: Arc<dyn ConventionRepository>,
        notifier: Arc<RecordingNotifier>,
        mailer: Arc<RecordingMailer>,
    ) -> Self {
        let tokens = TokenService::new(convention_token::generate_signing_key());
        let agencies = InMemoryAgencyDirectory::new().with_agency(
            AgencyId::new(AGENCY),
            AgencyContacts {
                counsellor_emails: vec![COUNSELLOR.to_string()],
                validator_emails: vec![VALIDATOR.to_string()],
            },
        );
        let service = ConventionService::new(
            config,
            tokens.clone(),
            repository.clone(),
            ServicePorts {
                notifications: notifier.clone(),
                mailer: mailer.clone(),
                agencies: Arc::new(agencies),
            },
        );
        Self {
            service,
            tokens,
            repository,
            notifier,
            mailer,
        }
    }

    /// Link tokens of the convention, keyed by role
    pub async fn tokens_for(&self, aggregate: &ConventionAggregate) -> BTreeMap<Role, String> {
        self.service
            .issue_initial_links(&aggregate.id)
            .await
            .unwrap()
            .into_iter()
            .map(|(role, link)| (role, token_from_url(&link.url)))
            .collect()
    }
}

pub fn token_from_url(url: &str) -> String {
    url.split_once("?jwt=")
        .map(|(_, token)| token.to_string())
        .unwrap()
}
