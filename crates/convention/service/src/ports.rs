//! Outbound ports and their in-memory implementations
//!
//! The lifecycle core never talks to email providers or agency registries
//! directly. It calls these traits; production wiring supplies adapters.

use async_trait::async_trait;
use convention_types::{AgencyId, ConventionId, ConventionStatus, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use thiserror::Error;

/// Failure reported by an outbound port
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("rejected: {0}")]
    Rejected(String),
}

/// Receives lifecycle events. Delivery is best-effort.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn on_status_changed(
        &self,
        convention_id: &ConventionId,
        from: ConventionStatus,
        to: ConventionStatus,
    ) -> Result<(), PortError>;

    async fn on_signature_recorded(
        &self,
        convention_id: &ConventionId,
        role: Role,
    ) -> Result<(), PortError>;
}

/// Sends magic links by email
#[async_trait]
pub trait MagicLinkMailer: Send + Sync {
    async fn send_magic_link(&self, link: &MagicLinkMessage) -> Result<(), PortError>;
}

/// Resolves the agency-side recipients of a convention
#[async_trait]
pub trait AgencyDirectory: Send + Sync {
    async fn agency_contacts(&self, agency_id: &AgencyId) -> Result<AgencyContacts, PortError>;
}

/// One magic link addressed to one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicLinkMessage {
    pub recipient: String,
    pub convention_id: ConventionId,
    pub role: Role,
    pub url: String,
}

/// Agency staff reachable by email
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencyContacts {
    pub counsellor_emails: Vec<String>,
    pub validator_emails: Vec<String>,
}

impl AgencyContacts {
    pub fn emails_for(&self, role: Role) -> &[String] {
        match role {
            Role::Counsellor => &self.counsellor_emails,
            Role::Validator => &self.validator_emails,
            _ => &[],
        }
    }
}

// ── In-memory implementations ──────────────────────────────────────────

/// An event captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    StatusChanged {
        convention_id: ConventionId,
        from: ConventionStatus,
        to: ConventionStatus,
    },
    SignatureRecorded {
        convention_id: ConventionId,
        role: Role,
    },
}

/// Keeps every notification in memory. Can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every call fails after recording the event
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    fn record(&self, event: NotificationEvent) -> Result<(), PortError> {
        self.events
            .lock()
            .map_err(|_| PortError::Unavailable("notifier lock poisoned".to_string()))?
            .push(event);
        if self.fail {
            return Err(PortError::Unavailable("notification backend down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn on_status_changed(
        &self,
        convention_id: &ConventionId,
        from: ConventionStatus,
        to: ConventionStatus,
    ) -> Result<(), PortError> {
        self.record(NotificationEvent::StatusChanged {
            convention_id: convention_id.clone(),
            from,
            to,
        })
    }

    async fn on_signature_recorded(
        &self,
        convention_id: &ConventionId,
        role: Role,
    ) -> Result<(), PortError> {
        self.record(NotificationEvent::SignatureRecorded {
            convention_id: convention_id.clone(),
            role,
        })
    }
}

/// Keeps every sent link in memory instead of emailing it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MagicLinkMessage>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<MagicLinkMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MagicLinkMailer for RecordingMailer {
    async fn send_magic_link(&self, link: &MagicLinkMessage) -> Result<(), PortError> {
        if self.fail {
            return Err(PortError::Unavailable("smtp relay refused connection".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| PortError::Unavailable("mailer lock poisoned".to_string()))?
            .push(link.clone());
        Ok(())
    }
}

/// Agency directory backed by a map. Unknown agencies have no contacts.
#[derive(Default)]
pub struct InMemoryAgencyDirectory {
    agencies: RwLock<HashMap<AgencyId, AgencyContacts>>,
}

impl InMemoryAgencyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agency(self, agency_id: AgencyId, contacts: AgencyContacts) -> Self {
        if let Ok(mut agencies) = self.agencies.write() {
            agencies.insert(agency_id, contacts);
        }
        self
    }
}

#[async_trait]
impl AgencyDirectory for InMemoryAgencyDirectory {
    async fn agency_contacts(&self, agency_id: &AgencyId) -> Result<AgencyContacts, PortError> {
        let agencies = self
            .agencies
            .read()
            .map_err(|_| PortError::Unavailable("agency directory lock poisoned".to_string()))?;
        Ok(agencies.get(agency_id).cloned().unwrap_or_default())
    }
}
