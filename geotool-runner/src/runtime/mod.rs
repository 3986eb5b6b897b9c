//! Container runtime abstraction
//!
//! The lifecycle controller only talks to the daemon through the narrow
//! `ContainerRuntime` capability set, so the concrete client can be swapped
//! (or faked in tests).

mod podman;

#[cfg(test)]
pub(crate) mod fake;

pub use podman::PodmanRuntime;

use async_trait::async_trait;
use geotool_core::ContainerSpec;

use crate::error::RuntimeError;

/// A container known to the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    /// Raw daemon state name (e.g., "running", "exited")
    pub state: String,
}

/// Daemon version metadata, for diagnostics only
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaemonVersion {
    pub release: Option<String>,
    pub api_version: Option<String>,
}

/// Capabilities the orchestrator needs from a container daemon
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Liveness probe
    async fn ping(&self) -> Result<(), RuntimeError>;

    async fn version(&self) -> Result<DaemonVersion, RuntimeError>;

    /// Lists containers (running or not) whose name equals `name` exactly
    async fn list_containers(&self, name: &str) -> Result<Vec<ContainerSummary>, RuntimeError>;

    /// Creates and starts a detached container, returning its id
    ///
    /// A container that was created but failed to start is removed again
    /// before the error is returned.
    async fn create_and_start(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;

    /// Current raw daemon state name of a container
    async fn status(&self, name: &str) -> Result<String, RuntimeError>;

    /// Blocks until the container is no longer running, returning its exit code
    async fn wait(&self, name: &str) -> Result<i64, RuntimeError>;

    /// Full stdout/stderr log stream as raw frames in emission order
    async fn logs(&self, name: &str) -> Result<Vec<Vec<u8>>, RuntimeError>;

    async fn stop(&self, name: &str) -> Result<(), RuntimeError>;

    /// Force-removes a container
    async fn remove(&self, name: &str) -> Result<(), RuntimeError>;
}
