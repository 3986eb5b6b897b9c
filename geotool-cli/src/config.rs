//! CLI configuration

use anyhow::{Context, Result};
use geotool_runner::{RunnerConfig, Secrets};
use tracing::debug;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the secrets file
    pub secrets_path: String,
}

impl Config {
    /// Loads and validates the runner configuration from the secrets file
    pub fn runner_config(&self) -> Result<RunnerConfig> {
        let secrets = Secrets::load(&self.secrets_path)
            .with_context(|| format!("Failed to load secrets from {}", self.secrets_path))?;

        let config = RunnerConfig::from_secrets(&secrets).context("Invalid secrets file")?;
        config.validate().context("Invalid runner configuration")?;

        debug!(
            "Loaded configuration: podman_uri={}, data_root={}",
            config.podman_uri,
            config.host_data_root.display()
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_runner_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "PODMAN_URI=tcp://127.0.0.1:8888").unwrap();
        writeln!(file, "GEOAPI_PATH=/home/geoapi").unwrap();

        let config = Config {
            secrets_path: file.path().display().to_string(),
        };
        let runner = config.runner_config().unwrap();
        assert_eq!(runner.podman_uri, "tcp://127.0.0.1:8888");
    }

    #[test]
    fn test_runner_config_missing_file() {
        let config = Config {
            secrets_path: "/nonexistent/secret.txt".to_string(),
        };
        let err = config.runner_config().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/secret.txt"));
    }

    #[test]
    fn test_runner_config_rejects_bad_uri() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "PODMAN_URI=ssh://host").unwrap();
        writeln!(file, "GEOAPI_PATH=/home/geoapi").unwrap();

        let config = Config {
            secrets_path: file.path().display().to_string(),
        };
        assert!(config.runner_config().is_err());
    }
}
