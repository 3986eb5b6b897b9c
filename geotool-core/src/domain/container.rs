//! Container domain types
//!
//! Describes what a tool run looks like to the container runtime: the image,
//! the bind mounts, the environment and the command. A `ContainerSpec` is built
//! once per job and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// In-container path the per-job input directory is mounted at
pub const CONTAINER_IN: &str = "/in";

/// In-container path the per-job output directory is mounted at
pub const CONTAINER_OUT: &str = "/out";

/// A host (or shared storage) path made visible inside the container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindMount {
    /// Path as seen by the container daemon
    pub source: String,
    /// Path inside the container
    pub target: String,
    pub read_only: bool,
}

impl BindMount {
    pub fn read_only(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: true,
        }
    }

    pub fn read_write(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }
}

/// Immutable description of a single container run
///
/// Mounts and environment are optional; a spec with neither is valid.
/// Environment keys are unique by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Image reference (e.g., ghcr.io/vforwater/tbr_skgstat:latest)
    pub image: String,
    /// Container name, unique among live containers at submission time
    pub name: String,
    pub mounts: Vec<BindMount>,
    pub environment: BTreeMap<String, String>,
    /// Command argument vector; empty means the image default
    pub command: Vec<String>,
    /// Network mode tag (e.g., "host", "bridge")
    pub network_mode: Option<String>,
}

impl ContainerSpec {
    /// Creates a spec with no mounts, environment or command override
    pub fn new(image: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            name: name.into(),
            mounts: Vec::new(),
            environment: BTreeMap::new(),
            command: Vec::new(),
            network_mode: None,
        }
    }

    pub fn with_mount(mut self, mount: BindMount) -> Self {
        self.mounts.push(mount);
        self
    }

    pub fn with_mounts(mut self, mounts: impl IntoIterator<Item = BindMount>) -> Self {
        self.mounts.extend(mounts);
        self
    }

    /// Sets an environment variable, replacing any previous value for the key
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_network_mode(mut self, mode: impl Into<String>) -> Self {
        self.network_mode = Some(mode.into());
        self
    }

    /// Environment rendered as `KEY=VALUE` pairs, the form runtimes expect
    pub fn env_pairs(&self) -> Vec<String> {
        self.environment
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }
}

/// Lifecycle state of a container as reported by the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Created,
    Running,
    Exited,
    Failed,
    Unknown,
}

impl ContainerStatus {
    /// Maps a daemon state name onto a status
    ///
    /// Podman and the Docker-compatible API use slightly different vocabularies;
    /// both are accepted.
    pub fn from_daemon(state: &str) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "created" | "configured" | "initialized" => ContainerStatus::Created,
            "running" | "restarting" | "paused" | "stopping" => ContainerStatus::Running,
            "exited" | "stopped" => ContainerStatus::Exited,
            "dead" => ContainerStatus::Failed,
            _ => ContainerStatus::Unknown,
        }
    }

    /// True for states from which no further execution occurs
    pub fn is_terminal(&self) -> bool {
        matches!(self, ContainerStatus::Exited | ContainerStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerStatus::Created => "created",
            ContainerStatus::Running => "running",
            ContainerStatus::Exited => "exited",
            ContainerStatus::Failed => "failed",
            ContainerStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
