//! conventionctl subcommands

use anyhow::{bail, Context};
use chrono::Duration;
use clap::Subcommand;
use convention_engine::{Trigger, TRANSITIONS};
use convention_service::{LinkBuilder, ServiceConfig};
use convention_token::{
    generate_signing_key, signing_key_to_hex, verifying_key_to_hex, TokenError, TokenService,
    TokenVerifier,
};
use convention_types::{ConventionId, ConventionStatus, Role};
use serde_json::json;

#[derive(Subcommand)]
pub enum Command {
    /// Generate a new Ed25519 key pair
    Keygen,

    /// Issue a magic link for one role on one convention
    Issue {
        /// Convention identifier
        #[arg(long)]
        convention: String,

        /// Role carried by the link (e.g. beneficiary, counsellor)
        #[arg(long)]
        role: Role,

        /// Current token version of the convention
        #[arg(long, default_value_t = 0)]
        token_version: u64,

        /// Lifetime in seconds; defaults to the configured TTL for the role
        #[arg(long)]
        ttl_secs: Option<i64>,
    },

    /// Issue a backoffice credential
    Backoffice {
        /// Administrator identifier
        #[arg(long)]
        subject: String,
    },

    /// Verify a token against a convention's current token version
    Verify {
        token: String,

        #[arg(long)]
        token_version: u64,
    },

    /// Show the payload of a token whose signature is valid, even if it
    /// expired or went stale
    Inspect { token: String },

    /// Print the lifecycle transition table
    Transitions {
        /// Only edges leaving this status
        #[arg(long)]
        from: Option<ConventionStatus>,
    },
}

pub fn run(command: Command, config_path: Option<&str>) -> anyhow::Result<()> {
    let load_config = || -> anyhow::Result<ServiceConfig> {
        let config = ServiceConfig::load(config_path).context("failed to load configuration")?;
        config.validate()?;
        Ok(config)
    };

    match command {
        Command::Keygen => keygen(),
        Command::Issue {
            convention,
            role,
            token_version,
            ttl_secs,
        } => issue(&load_config()?, convention, role, token_version, ttl_secs),
        Command::Backoffice { subject } => backoffice(&load_config()?, subject),
        Command::Verify {
            token,
            token_version,
        } => verify(&load_config()?, &token, token_version),
        Command::Inspect { token } => inspect(&load_config()?, &token),
        Command::Transitions { from } => transitions(from),
    }
}

fn issue(
    config: &ServiceConfig,
    convention: String,
    role: Role,
    token_version: u64,
    ttl_secs: Option<i64>,
) -> anyhow::Result<()> {
    let tokens = TokenService::new(config.keys.signing_key()?);
    let ttl = match ttl_secs {
        Some(secs) => Duration::try_seconds(secs)
            .with_context(|| format!("--ttl-secs {secs} is out of range"))?,
        None => config.links.ttl_for(role)?,
    };
    let token = tokens.issue(ConventionId::new(convention), role, token_version, ttl)?;
    tracing::info!(
        convention_id = %token.payload().convention_id,
        %role,
        token_version,
        "link issued"
    );
    print_json(&json!({
        "url": LinkBuilder::new(&config.links).url(&token),
        "token": token.as_str(),
        "expiresAt": token.payload().expires_at(),
    }))
}

fn backoffice(config: &ServiceConfig, subject: String) -> anyhow::Result<()> {
    let tokens = TokenService::new(config.keys.signing_key()?);
    let credential = tokens.issue_backoffice(subject, config.links.backoffice_ttl()?)?;
    print_json(&json!({
        "credential": credential.as_str(),
        "subject": credential.claims().sub,
        "expiresAt": credential.claims().expires_at(),
    }))
}

fn verify(config: &ServiceConfig, token: &str, token_version: u64) -> anyhow::Result<()> {
    let verifier = TokenVerifier::new(config.keys.verifying_key()?);
    match verifier.verify(token, token_version) {
        Ok(grant) => print_json(&json!({
            "valid": true,
            "conventionId": grant.convention_id,
            "role": grant.role,
            "tokenVersion": grant.token_version,
            "expiresAt": grant.expires_at,
        })),
        Err(err) => {
            print_json(&json!({
                "valid": false,
                "error": err.to_string(),
                "renewable": err.is_renewable(),
            }))?;
            bail!(err)
        }
    }
}

fn inspect(config: &ServiceConfig, token: &str) -> anyhow::Result<()> {
    let verifier = TokenVerifier::new(config.keys.verifying_key()?);
    let Some(payload) = verifier.decode_without_verifying(token) else {
        bail!(TokenError::InvalidSignature);
    };
    print_json(&json!({
        "payload": payload,
        "issuedAt": payload.issued_at(),
        "expiresAt": payload.expires_at(),
    }))
}

fn keygen() -> anyhow::Result<()> {
    let key = generate_signing_key();
    print_json(&json!({
        "signingKeyHex": signing_key_to_hex(&key),
        "verifyingKeyHex": verifying_key_to_hex(&key.verifying_key()),
    }))
}

fn transitions(from: Option<ConventionStatus>) -> anyhow::Result<()> {
    for rule in TRANSITIONS {
        let triggers = match rule.trigger {
            Trigger::Roles(roles) => roles
                .iter()
                .map(Role::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            Trigger::System => "system".to_string(),
        };
        for source in rule.from {
            if from.is_some_and(|status| status != *source) {
                continue;
            }
            println!(
                "{:<24} -> {:<24} {:<40} {:?}",
                source.as_str(),
                rule.to.as_str(),
                triggers,
                rule.guard
            );
        }
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
