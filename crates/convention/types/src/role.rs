use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A party that can act on a convention.
///
/// Serialized in kebab-case (`legal-representative`), which is also the
/// form embedded in capability tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Beneficiary,
    LegalRepresentative,
    EstablishmentRepresentative,
    EstablishmentTutor,
    Counsellor,
    Validator,
    BackofficeAdmin,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Beneficiary,
        Role::LegalRepresentative,
        Role::EstablishmentRepresentative,
        Role::EstablishmentTutor,
        Role::Counsellor,
        Role::Validator,
        Role::BackofficeAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Beneficiary => "beneficiary",
            Role::LegalRepresentative => "legal-representative",
            Role::EstablishmentRepresentative => "establishment-representative",
            Role::EstablishmentTutor => "establishment-tutor",
            Role::Counsellor => "counsellor",
            Role::Validator => "validator",
            Role::BackofficeAdmin => "backoffice-admin",
        }
    }

    /// Roles that may appear as a signatory on a convention
    pub fn is_signatory_role(&self) -> bool {
        matches!(
            self,
            Role::Beneficiary | Role::LegalRepresentative | Role::EstablishmentRepresentative
        )
    }

    /// Agency-side roles, whose recipients come from the agency directory
    pub fn is_agency_role(&self) -> bool {
        matches!(self, Role::Counsellor | Role::Validator)
    }

    /// Whether the role is carried by a convention-scoped magic link.
    /// `backoffice-admin` uses a separate global credential.
    pub fn is_convention_scoped(&self) -> bool {
        !matches!(self, Role::BackofficeAdmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
