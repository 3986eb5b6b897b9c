//! Container command handlers
//!
//! Handles daemon checks and explicit container removal.

use anyhow::{Context, Result};
use colored::*;
use geotool_runner::{ToolRunner, connect};

use crate::config::Config;

/// Probe the podman service and print its version
pub async fn ping(config: &Config) -> Result<()> {
    let runner_config = config.runner_config()?;

    let connection = connect(&runner_config.podman_uri, runner_config.connect_timeout)
        .await
        .context("Podman service is not reachable")?;

    println!(
        "{} Podman service at {} is running",
        "✓".green(),
        connection.endpoint().bold()
    );

    if let Some(version) = connection.version() {
        println!(
            "  Release:      {}",
            version.release.as_deref().unwrap_or("unknown").dimmed()
        );
        println!(
            "  API version:  {}",
            version.api_version.as_deref().unwrap_or("unknown").dimmed()
        );
    }

    Ok(())
}

/// Force-remove a container by name
pub async fn remove(config: &Config, name: &str) -> Result<()> {
    let runner_config = config.runner_config()?;

    let connection = connect(&runner_config.podman_uri, runner_config.connect_timeout)
        .await
        .context("Podman service is not reachable")?;

    ToolRunner::new(runner_config)
        .controller()
        .remove(&connection, name)
        .await?;

    println!("{} Container {} removed", "✓".green(), name.bold());
    Ok(())
}
