//! Runner configuration
//!
//! Built once at process start from the secrets file and passed by reference
//! into the connection manager, the staging layer and the tool runner.
//! Nothing in the library looks configuration up on its own.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::lifecycle::{LifecycleOptions, RemovalPolicy};
use crate::secrets::Secrets;

/// Default podman service socket
pub const DEFAULT_PODMAN_URI: &str = "unix:///run/podman/podman.sock";

/// Suffix of secrets keys overriding a tool image (e.g. VARIOGRAM_IMAGE)
const IMAGE_KEY_SUFFIX: &str = "_IMAGE";

/// Metacatalog database connection components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetacatalogConfig {
    pub user: String,
    pub host: String,
    pub port: String,
    pub database: String,
}

impl MetacatalogConfig {
    /// Connection URI handed to tools that read from the metacatalog
    pub fn uri(&self) -> String {
        format!(
            "postgresql://{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Container daemon endpoint (unix://, tcp:// or http://)
    pub podman_uri: String,

    /// Request timeout for the daemon connection
    pub connect_timeout: Duration,

    /// Data root as seen by this process, where job directories are written
    pub host_data_root: PathBuf,

    /// Data root as seen by the container daemon, used for bind mount sources
    pub server_data_root: PathBuf,

    /// Shared dataset directory mounted read-only at the same path, if any
    pub shared_data_path: Option<String>,

    /// Network mode tag for tool containers
    pub network_mode: String,

    /// Upper bound on a single tool run, `None` waits forever
    pub wait_timeout: Option<Duration>,

    /// What happens to a container after its logs were collected
    pub removal_policy: RemovalPolicy,

    /// Image overrides keyed by tool id
    pub images: HashMap<String, String>,

    pub metacatalog: Option<MetacatalogConfig>,
}

impl RunnerConfig {
    /// Creates a configuration with defaults for everything but the data root
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        let data_root = data_root.into();
        Self {
            podman_uri: DEFAULT_PODMAN_URI.to_string(),
            connect_timeout: Duration::from_secs(120),
            host_data_root: data_root.clone(),
            server_data_root: data_root,
            shared_data_path: None,
            network_mode: "host".to_string(),
            wait_timeout: Some(Duration::from_secs(3600)), // 1 hour
            removal_policy: RemovalPolicy::Retain,
            images: HashMap::new(),
            metacatalog: None,
        }
    }

    /// Creates configuration from a parsed secrets file
    ///
    /// Recognized keys:
    /// - GEOAPI_PATH (required, host data root)
    /// - DATA_PATH (optional, daemon-visible data root, default: GEOAPI_PATH)
    /// - PODMAN_URI (optional, default: unix:///run/podman/podman.sock)
    /// - SHARED_DATA_PATH (optional)
    /// - NETWORK_MODE (optional, default: host)
    /// - WAIT_TIMEOUT (optional, seconds, 0 = unbounded, default: 3600)
    /// - CONNECT_TIMEOUT (optional, seconds, default: 120)
    /// - REMOVAL_POLICY (optional, retain|remove, default: retain)
    /// - USER, HOST, PORT, DATABASE (optional, all four for the metacatalog)
    /// - <TOOL_ID>_IMAGE (optional, per tool image override)
    pub fn from_secrets(secrets: &Secrets) -> Result<Self, ConfigError> {
        let mut config = Self::new(secrets.require("GEOAPI_PATH")?);

        if let Some(server_root) = secrets.get("DATA_PATH") {
            config.server_data_root = PathBuf::from(server_root);
        }

        if let Some(uri) = secrets.get("PODMAN_URI") {
            config.podman_uri = uri.to_string();
        }

        config.shared_data_path = secrets
            .get("SHARED_DATA_PATH")
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        if let Some(mode) = secrets.get("NETWORK_MODE") {
            config.network_mode = mode.to_string();
        }

        if let Some(secs) = secrets.get("WAIT_TIMEOUT") {
            let secs = parse_seconds("WAIT_TIMEOUT", secs)?;
            config.wait_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(secs) = secrets.get("CONNECT_TIMEOUT") {
            config.connect_timeout = Duration::from_secs(parse_seconds("CONNECT_TIMEOUT", secs)?);
        }

        if let Some(policy) = secrets.get("REMOVAL_POLICY") {
            config.removal_policy =
                policy
                    .parse()
                    .map_err(|reason: String| ConfigError::InvalidValue {
                        key: "REMOVAL_POLICY".to_string(),
                        reason,
                    })?;
        }

        config.metacatalog = match (
            secrets.get("USER"),
            secrets.get("HOST"),
            secrets.get("PORT"),
            secrets.get("DATABASE"),
        ) {
            (Some(user), Some(host), Some(port), Some(database)) => Some(MetacatalogConfig {
                user: user.to_string(),
                host: host.to_string(),
                port: port.to_string(),
                database: database.to_string(),
            }),
            _ => None,
        };

        for (key, value) in secrets.iter() {
            if let Some(tool) = key.strip_suffix(IMAGE_KEY_SUFFIX) {
                config
                    .images
                    .insert(tool.to_ascii_lowercase(), value.to_string());
            }
        }

        Ok(config)
    }

    /// Adds an image override for a tool
    pub fn with_image(mut self, tool_id: impl Into<String>, image: impl Into<String>) -> Self {
        self.images.insert(tool_id.into(), image.into());
        self
    }

    /// Image to run for a tool, falling back to the tool's default
    pub fn image_for(&self, tool_id: &str, default: &str) -> String {
        self.images
            .get(tool_id)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Lifecycle controller options derived from this configuration
    pub fn lifecycle_options(&self) -> LifecycleOptions {
        LifecycleOptions {
            wait_timeout: self.wait_timeout,
            removal_policy: self.removal_policy,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.podman_uri.is_empty() {
            return Err(invalid("PODMAN_URI", "cannot be empty"));
        }

        if !["unix://", "tcp://", "http://"]
            .iter()
            .any(|scheme| self.podman_uri.starts_with(scheme))
        {
            return Err(invalid(
                "PODMAN_URI",
                "must start with unix://, tcp:// or http://",
            ));
        }

        if self.connect_timeout.as_secs() == 0 {
            return Err(invalid("CONNECT_TIMEOUT", "must be greater than 0"));
        }

        if self.host_data_root.as_os_str().is_empty() {
            return Err(invalid("GEOAPI_PATH", "cannot be empty"));
        }

        if self.network_mode.is_empty() {
            return Err(invalid("NETWORK_MODE", "cannot be empty"));
        }

        Ok(())
    }
}

fn parse_seconds(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets(pairs: &[(&str, &str)]) -> Secrets {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::new("/home/geoapi");
        assert_eq!(config.podman_uri, DEFAULT_PODMAN_URI);
        assert_eq!(config.wait_timeout, Some(Duration::from_secs(3600)));
        assert_eq!(config.removal_policy, RemovalPolicy::Retain);
        assert_eq!(config.server_data_root, PathBuf::from("/home/geoapi"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_secrets() {
        let config = RunnerConfig::from_secrets(&secrets(&[
            ("PODMAN_URI", "unix:///run/user/1000/podman/podman.sock"),
            ("GEOAPI_PATH", "/home/geoapi"),
            ("DATA_PATH", "/srv/geoapi"),
            ("SHARED_DATA_PATH", "/data"),
            ("WAIT_TIMEOUT", "0"),
            ("REMOVAL_POLICY", "remove"),
            ("USER", "postgres"),
            ("HOST", "localhost"),
            ("PORT", "5432"),
            ("DATABASE", "metacatalog"),
            ("VARIOGRAM_IMAGE", "registry.local/skgstat:v2"),
        ]))
        .unwrap();

        assert_eq!(config.podman_uri, "unix:///run/user/1000/podman/podman.sock");
        assert_eq!(config.host_data_root, PathBuf::from("/home/geoapi"));
        assert_eq!(config.server_data_root, PathBuf::from("/srv/geoapi"));
        assert_eq!(config.shared_data_path.as_deref(), Some("/data"));
        assert_eq!(config.wait_timeout, None);
        assert_eq!(config.removal_policy, RemovalPolicy::Remove);
        assert_eq!(
            config.metacatalog.unwrap().uri(),
            "postgresql://postgres@localhost:5432/metacatalog"
        );
        assert_eq!(
            config.images.get("variogram").map(String::as_str),
            Some("registry.local/skgstat:v2")
        );
    }

    #[test]
    fn test_from_secrets_requires_data_root() {
        let err = RunnerConfig::from_secrets(&secrets(&[("PODMAN_URI", DEFAULT_PODMAN_URI)]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(k) if k == "GEOAPI_PATH"));
    }

    #[test]
    fn test_from_secrets_rejects_bad_numbers() {
        let err = RunnerConfig::from_secrets(&secrets(&[
            ("GEOAPI_PATH", "/home/geoapi"),
            ("WAIT_TIMEOUT", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "WAIT_TIMEOUT"));
    }

    #[test]
    fn test_metacatalog_needs_all_components() {
        let config = RunnerConfig::from_secrets(&secrets(&[
            ("GEOAPI_PATH", "/home/geoapi"),
            ("USER", "postgres"),
            ("HOST", "localhost"),
        ]))
        .unwrap();
        assert!(config.metacatalog.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = RunnerConfig::new("/home/geoapi");

        config.podman_uri = "ssh://host/run/podman.sock".to_string();
        assert!(config.validate().is_err());

        config.podman_uri = "tcp://127.0.0.1:8888".to_string();
        assert!(config.validate().is_ok());

        config.connect_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_image_for() {
        let config = RunnerConfig::new("/home/geoapi").with_image("variogram", "local/skgstat:dev");
        assert_eq!(config.image_for("variogram", "default:latest"), "local/skgstat:dev");
        assert_eq!(
            config.image_for("whiteboxgis_tool", "tool_whiteboxgis:latest"),
            "tool_whiteboxgis:latest"
        );
    }

    #[test]
    fn test_lifecycle_options_follow_config() {
        let mut config = RunnerConfig::new("/home/geoapi");
        config.wait_timeout = Some(Duration::from_secs(30));
        config.removal_policy = RemovalPolicy::Remove;

        let options = config.lifecycle_options();
        assert_eq!(options.wait_timeout, Some(Duration::from_secs(30)));
        assert_eq!(options.removal_policy, RemovalPolicy::Remove);
    }
}
