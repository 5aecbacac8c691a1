use crate::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named person with a reachable email address
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl Contact {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
        }
    }
}

/// A party whose signature is required before the convention goes to review
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatory {
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Set exactly once by signature recording
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
}

impl Signatory {
    pub fn from_contact(role: Role, contact: &Contact) -> Self {
        Self {
            role,
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            email: contact.email.clone(),
            signed_at: None,
        }
    }

    pub fn has_signed(&self) -> bool {
        self.signed_at.is_some()
    }

    /// Case-insensitive email comparison, ignoring surrounding whitespace
    pub fn has_email(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }
}
