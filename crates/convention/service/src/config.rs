//! Configuration for the convention service

use crate::{ServiceError, ServiceResult};
use chrono::Duration;
use convention_token::{
    read_signing_key, signing_key_from_hex, verifying_key_from_hex, SigningKey, VerifyingKey,
};
use convention_types::Role;
use serde::{Deserialize, Serialize};

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Magic link configuration
    #[serde(default)]
    pub links: LinksConfig,

    /// Optimistic concurrency configuration
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// Feature flags
    #[serde(default)]
    pub features: FeatureFlags,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Token key material
    #[serde(default)]
    pub keys: KeyConfig,
}

/// Magic link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    /// Public base URL the links point at
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the convention page
    #[serde(default = "default_link_path")]
    pub path: String,

    /// Lifetime of links sent to signatories and the establishment tutor
    #[serde(default = "default_link_ttl")]
    pub signatory_ttl_secs: i64,

    /// Lifetime of links sent to counsellors and validators
    #[serde(default = "default_link_ttl")]
    pub agency_ttl_secs: i64,

    /// Lifetime of backoffice credentials
    #[serde(default = "default_backoffice_ttl")]
    pub backoffice_ttl_secs: i64,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            path: default_link_path(),
            signatory_ttl_secs: default_link_ttl(),
            agency_ttl_secs: default_link_ttl(),
            backoffice_ttl_secs: default_backoffice_ttl(),
        }
    }
}

/// Longest lifetime accepted for any link or credential
pub const MAX_TTL_SECS: i64 = 366 * 24 * 3600;

impl LinksConfig {
    /// Link lifetime for a convention-scoped role
    pub fn ttl_for(&self, role: Role) -> ServiceResult<Duration> {
        if role.is_agency_role() {
            ttl("links.agency_ttl_secs", self.agency_ttl_secs)
        } else {
            ttl("links.signatory_ttl_secs", self.signatory_ttl_secs)
        }
    }

    pub fn backoffice_ttl(&self) -> ServiceResult<Duration> {
        ttl("links.backoffice_ttl_secs", self.backoffice_ttl_secs)
    }
}

fn ttl(name: &str, secs: i64) -> ServiceResult<Duration> {
    Duration::try_seconds(secs)
        .ok_or_else(|| ServiceError::Config(format!("{name} is out of range: {secs}")))
}

/// Optimistic concurrency configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Save attempts per request before giving up with a conflict
    #[serde(default = "default_max_save_attempts")]
    pub max_save_attempts: u32,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_save_attempts: default_max_save_attempts(),
        }
    }
}

/// Feature flags injected into the use-case layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Send the counsellor link to the PE-Connect advisor of the
    /// beneficiary as well
    #[serde(default)]
    pub pe_connect_advisor_links: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Ed25519 key material, hex encoded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Private signing key
    #[serde(default)]
    pub signing_key_hex: Option<String>,

    /// File holding the private signing key
    #[serde(default)]
    pub signing_key_path: Option<String>,

    /// Public key, for verifier-only deployments
    #[serde(default)]
    pub verifying_key_hex: Option<String>,
}

impl KeyConfig {
    /// Load the signing key, preferring the inline value over the file
    pub fn signing_key(&self) -> ServiceResult<SigningKey> {
        match (&self.signing_key_hex, &self.signing_key_path) {
            (Some(encoded), _) => Ok(signing_key_from_hex(encoded)?),
            (None, Some(path)) => Ok(read_signing_key(path)?),
            (None, None) => Err(ServiceError::Config(
                "no signing key configured (keys.signing_key_hex or keys.signing_key_path)"
                    .to_string(),
            )),
        }
    }

    /// Public key: the configured one, or the one derived from the
    /// signing key
    pub fn verifying_key(&self) -> ServiceResult<VerifyingKey> {
        match &self.verifying_key_hex {
            Some(encoded) => Ok(verifying_key_from_hex(encoded)?),
            None => Ok(self.signing_key()?.verifying_key()),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_link_path() -> String {
    "/convention".to_string()
}

fn default_link_ttl() -> i64 {
    30 * 24 * 3600
}

fn default_backoffice_ttl() -> i64 {
    24 * 3600
}

fn default_max_save_attempts() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServiceConfig {
    /// Load configuration from defaults, an optional file and
    /// `CONVENTION_*` environment variables
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&ServiceConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // CONVENTION_LINKS__BASE_URL, CONVENTION_CONCURRENCY__MAX_SAVE_ATTEMPTS, ...
        builder = builder.add_source(
            config::Environment::with_prefix("CONVENTION")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> ServiceResult<()> {
        if self.links.base_url.trim().is_empty() {
            return Err(ServiceError::Config("links.base_url is empty".to_string()));
        }
        if self.concurrency.max_save_attempts == 0 {
            return Err(ServiceError::Config(
                "concurrency.max_save_attempts must be at least 1".to_string(),
            ));
        }
        for (name, ttl) in [
            ("links.signatory_ttl_secs", self.links.signatory_ttl_secs),
            ("links.agency_ttl_secs", self.links.agency_ttl_secs),
            ("links.backoffice_ttl_secs", self.links.backoffice_ttl_secs),
        ] {
            if ttl <= 0 {
                return Err(ServiceError::Config(format!("{name} must be positive")));
            }
            if ttl > MAX_TTL_SECS {
                return Err(ServiceError::Config(format!(
                    "{name} must be at most {MAX_TTL_SECS}"
                )));
            }
        }
        Ok(())
    }

    /// Configuration for local development and tests
    pub fn development() -> Self {
        Self {
            links: LinksConfig {
                base_url: "http://localhost:3000".to_string(),
                ..LinksConfig::default()
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                json: false,
            },
            ..Self::default()
        }
    }
}
