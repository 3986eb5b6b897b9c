//! Error types for the runner
//!
//! Configuration and connection errors are fatal and surface to the caller.
//! Errors that happen after a container was launched are not here: they are
//! recorded on the `JobResult` as `geotool_core::LifecycleError`.

use std::path::PathBuf;
use thiserror::Error;

/// Secrets file or runner configuration problems
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read secrets file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A non-empty line without a `=` separator
    #[error("Malformed secrets entry on line {line}: expected KEY=VALUE")]
    Malformed { line: usize },

    #[error("Missing required key {0}")]
    MissingKey(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Container daemon errors
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Daemon unreachable or its liveness probe failed
    #[error("Container runtime at {endpoint} is unavailable: {message}")]
    Unavailable { endpoint: String, message: String },

    #[error("Unsupported runtime endpoint: {0}")]
    InvalidEndpoint(String),

    /// The daemon answered with an error status
    #[error("Daemon error (status {status}): {message}")]
    Daemon { status: u16, message: String },

    /// The request never produced a daemon answer
    #[error("Transport error: {0}")]
    Transport(String),
}

impl RuntimeError {
    /// Create a daemon error from status code and message
    pub fn daemon(status: u16, message: impl Into<String>) -> Self {
        Self::Daemon {
            status,
            message: message.into(),
        }
    }

    /// Check if the daemon reported the object as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Daemon { status: 404, .. })
    }

    /// The daemon's own message, without our framing
    pub fn message(&self) -> String {
        match self {
            Self::Daemon { message, .. } => message.clone(),
            Self::Unavailable { message, .. } => message.clone(),
            Self::Transport(message) => message.clone(),
            Self::InvalidEndpoint(endpoint) => format!("unsupported endpoint {}", endpoint),
        }
    }
}

/// Job directory preparation errors
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize job parameters: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl StagingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors that escape a tool invocation
///
/// Everything past container launch is reported through the tool outputs
/// instead.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    /// Required endpoint input missing or unusable
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}
