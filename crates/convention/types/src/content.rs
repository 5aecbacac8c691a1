//! Business content of a convention and its validation schema
//!
//! Drafts may hold incomplete content. The full schema is enforced when a
//! draft is submitted for signature (`DRAFT -> READY_TO_SIGN`).

use crate::{ContentError, Contact, Role, Signatory};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Longest allowed immersion, in calendar days (inclusive of both ends)
pub const MAX_IMMERSION_DAYS: i64 = 30;

/// Upper bound on the weekly schedule
pub const MAX_WEEKLY_HOURS: u32 = 48;

/// Age under which the beneficiary needs a legal representative
pub const MAJORITY_AGE: u32 = 18;

/// Youngest beneficiary that can be placed
pub const MINIMUM_AGE: u32 = 16;

/// Business fields of a convention
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConventionContent {
    pub beneficiary: Contact,
    pub beneficiary_birth_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_representative: Option<Contact>,
    pub establishment_representative: Contact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub establishment_tutor: Option<Contact>,
    /// Advisor known through PE-Connect federation, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub federated_advisor: Option<Contact>,
    pub siret: String,
    pub business_name: String,
    pub immersion_address: String,
    pub immersion_objective: String,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub weekly_hours: u32,
}

/// A single failed rule of the validation schema
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ContentViolation {
    #[error("SIRET must be exactly 14 digits, got {0:?}")]
    InvalidSiret(String),

    #[error("field must not be empty: {0}")]
    EmptyField(String),

    #[error("end date {date_end} is not after start date {date_start}")]
    EndNotAfterStart {
        date_start: NaiveDate,
        date_end: NaiveDate,
    },

    #[error("immersion lasts {days} days, maximum is {MAX_IMMERSION_DAYS}")]
    DurationTooLong { days: i64 },

    #[error("weekly hours must be in 1..={MAX_WEEKLY_HOURS}, got {0}")]
    WeeklyHoursOutOfRange(u32),

    #[error("invalid email for {field}: {value:?}")]
    InvalidEmail { field: String, value: String },

    #[error("beneficiary is a minor on the start date and needs a legal representative")]
    MissingLegalRepresentative,

    #[error("beneficiary is an adult on the start date; no legal representative expected")]
    UnexpectedLegalRepresentative,

    #[error("beneficiary is {age} on the start date, minimum is {MINIMUM_AGE}")]
    BeneficiaryTooYoung { age: u32 },
}

impl ConventionContent {
    /// Age of the beneficiary on the first day of the immersion
    pub fn beneficiary_age_at_start(&self) -> u32 {
        self.date_start
            .years_since(self.beneficiary_birth_date)
            .unwrap_or(0)
    }

    pub fn beneficiary_is_minor(&self) -> bool {
        self.beneficiary_age_at_start() < MAJORITY_AGE
    }

    /// Inclusive duration in calendar days
    pub fn duration_days(&self) -> i64 {
        (self.date_end - self.date_start).num_days() + 1
    }

    /// Signatories implied by this content, in signing-page order.
    ///
    /// The legal representative is listed whenever the content names one;
    /// the schema separately checks that it is present iff the beneficiary
    /// is a minor.
    pub fn signatories(&self) -> Vec<Signatory> {
        let mut signatories = vec![Signatory::from_contact(Role::Beneficiary, &self.beneficiary)];
        if let Some(legal) = &self.legal_representative {
            signatories.push(Signatory::from_contact(Role::LegalRepresentative, legal));
        }
        signatories.push(Signatory::from_contact(
            Role::EstablishmentRepresentative,
            &self.establishment_representative,
        ));
        signatories
    }

    /// Run the full validation schema, collecting every violation
    pub fn validate(&self) -> Result<(), ContentError> {
        let mut violations = Vec::new();

        if self.siret.len() != 14 || !self.siret.chars().all(|c| c.is_ascii_digit()) {
            violations.push(ContentViolation::InvalidSiret(self.siret.clone()));
        }

        for (field, value) in [
            ("business_name", &self.business_name),
            ("immersion_address", &self.immersion_address),
            ("immersion_objective", &self.immersion_objective),
            ("beneficiary.last_name", &self.beneficiary.last_name),
            (
                "establishment_representative.last_name",
                &self.establishment_representative.last_name,
            ),
        ] {
            if value.trim().is_empty() {
                violations.push(ContentViolation::EmptyField(field.to_string()));
            }
        }

        if self.date_end <= self.date_start {
            violations.push(ContentViolation::EndNotAfterStart {
                date_start: self.date_start,
                date_end: self.date_end,
            });
        } else if self.duration_days() > MAX_IMMERSION_DAYS {
            violations.push(ContentViolation::DurationTooLong {
                days: self.duration_days(),
            });
        }

        if self.weekly_hours == 0 || self.weekly_hours > MAX_WEEKLY_HOURS {
            violations.push(ContentViolation::WeeklyHoursOutOfRange(self.weekly_hours));
        }

        let contacts = [
            ("beneficiary", Some(&self.beneficiary)),
            (
                "establishment_representative",
                Some(&self.establishment_representative),
            ),
            ("legal_representative", self.legal_representative.as_ref()),
            ("establishment_tutor", self.establishment_tutor.as_ref()),
            ("federated_advisor", self.federated_advisor.as_ref()),
        ];
        for (field, contact) in contacts {
            let Some(contact) = contact else { continue };
            if !looks_like_email(&contact.email) {
                violations.push(ContentViolation::InvalidEmail {
                    field: field.to_string(),
                    value: contact.email.clone(),
                });
            }
        }

        let age = self.beneficiary_age_at_start();
        if age < MINIMUM_AGE {
            violations.push(ContentViolation::BeneficiaryTooYoung { age });
        }
        match (self.beneficiary_is_minor(), &self.legal_representative) {
            (true, None) => violations.push(ContentViolation::MissingLegalRepresentative),
            (false, Some(_)) => violations.push(ContentViolation::UnexpectedLegalRepresentative),
            _ => {}
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ContentError { violations })
        }
    }
}

fn looks_like_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
