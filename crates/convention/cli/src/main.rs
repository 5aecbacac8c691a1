//! conventionctl - operator tooling for convention magic links
//!
//! - Generate Ed25519 key pairs
//! - Issue capability links and backoffice credentials
//! - Verify or inspect a token offline, with the public key only
//! - Print the lifecycle transition table

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// conventionctl CLI application
#[derive(Parser)]
#[command(name = "conventionctl")]
#[command(about = "Convention lifecycle - magic link tooling", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CONVENTION_CONFIG")]
    config: Option<String>,

    /// Log level
    #[arg(long, env = "CONVENTION_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "CONVENTION_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    commands::run(cli.command, cli.config.as_deref())
}
