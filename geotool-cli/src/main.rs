//! Geotool CLI
//!
//! Command-line interface for running containerized geoscience tools on a
//! podman service.

mod commands;
mod config;
mod params;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "geotool")]
#[command(about = "Run geoscience tool containers on a podman service", long_about = None)]
struct Cli {
    /// Secrets file with PODMAN_URI, data roots and database settings
    #[arg(long, env = "GEOTOOL_SECRETS", default_value = "secret.txt")]
    secrets: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, stdout carries the outputs document
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geotool=info,geotool_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        secrets_path: cli.secrets,
    };

    handle_command(cli.command, &config).await
}
