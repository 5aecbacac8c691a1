//! Magic link construction

use crate::LinksConfig;
use chrono::{DateTime, Utc};
use convention_token::CapabilityToken;
use convention_types::Role;
use serde::{Deserialize, Serialize};

/// Builds `{base_url}{path}?jwt={token}` URLs
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base_url: String,
    path: String,
}

impl LinkBuilder {
    pub fn new(config: &LinksConfig) -> Self {
        let path = config.path.trim();
        Self {
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            path: if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{path}")
            },
        }
    }

    /// The token alphabet is base64url plus `.`, so it needs no escaping
    pub fn url(&self, token: &CapabilityToken) -> String {
        format!("{}{}?jwt={}", self.base_url, self.path, token.as_str())
    }
}

/// A link issued for one role, with the people it goes to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedLink {
    pub role: Role,
    pub url: String,
    pub recipients: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use convention_token::TokenService;
    use convention_types::ConventionId;

    #[test]
    fn test_url_shape() {
        let config = LinksConfig {
            base_url: "https://immersion.example.org/".to_string(),
            path: "convention".to_string(),
            ..LinksConfig::default()
        };
        let tokens = TokenService::new(convention_token::generate_signing_key());
        let token = tokens
            .issue(
                ConventionId::new("conv-1"),
                Role::Beneficiary,
                0,
                chrono::Duration::hours(1),
            )
            .unwrap();

        let url = LinkBuilder::new(&config).url(&token);
        assert_eq!(
            url,
            format!("https://immersion.example.org/convention?jwt={}", token.as_str())
        );
    }
}
