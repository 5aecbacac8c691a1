//! Sample conventions shared by tests across the workspace

use crate::{AgencyId, Contact, ConventionAggregate, ConventionContent, ConventionId};
use chrono::{NaiveDate, Utc};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

/// Valid content for an adult beneficiary (two signatories)
pub fn adult_content() -> ConventionContent {
    ConventionContent {
        beneficiary: Contact::new("Jeanne", "Martin", "jeanne@example.org"),
        beneficiary_birth_date: date(1990, 4, 12),
        legal_representative: None,
        establishment_representative: Contact::new("Paul", "Durand", "paul@boulangerie.fr"),
        establishment_tutor: Some(Contact::new("Luc", "Petit", "luc@boulangerie.fr")),
        federated_advisor: None,
        siret: "12345678901234".to_string(),
        business_name: "Boulangerie Durand".to_string(),
        immersion_address: "1 rue du Pain, 75001 Paris".to_string(),
        immersion_objective: "Discover the bakery trade".to_string(),
        date_start: date(2026, 11, 2),
        date_end: date(2026, 11, 13),
        weekly_hours: 35,
    }
}

/// Valid content for a minor beneficiary (three signatories)
pub fn minor_content() -> ConventionContent {
    ConventionContent {
        beneficiary_birth_date: date(2009, 12, 1),
        legal_representative: Some(Contact::new("Anne", "Martin", "anne@example.org")),
        ..adult_content()
    }
}

pub fn draft_with(content: ConventionContent) -> ConventionAggregate {
    ConventionAggregate::new_draft(
        ConventionId::generate(),
        AgencyId::new("agency-paris-15"),
        content,
        Utc::now(),
    )
}

pub fn adult_draft() -> ConventionAggregate {
    draft_with(adult_content())
}
