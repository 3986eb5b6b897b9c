//! Lifecycle error taxonomy
//!
//! Errors raised after the runtime connection is established. None of these
//! abort a job: the lifecycle controller records them on the `JobResult` in the
//! order they occurred.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failed step of a container run
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleError {
    /// Stopping or removing a stale same-named container failed
    #[error("Failed to clear stale container {container}: {message}")]
    ConflictResolution { container: String, message: String },

    /// Image unresolvable or the daemon rejected the spec
    #[error("Failed to launch container {container}: {message}")]
    Launch { container: String, message: String },

    /// Daemon state could not be read
    #[error("Failed to read status of container {container}: {message}")]
    Status { container: String, message: String },

    /// Blocking for completion failed (e.g., daemon connection dropped)
    #[error("Failed while waiting for container {container}: {message}")]
    Wait { container: String, message: String },

    #[error("Container {container} did not finish within {seconds}s")]
    WaitTimedOut { container: String, seconds: u64 },

    #[error("Failed to collect logs of container {container}: {message}")]
    LogCollection { container: String, message: String },

    #[error("Failed to remove container {container}: {message}")]
    Removal { container: String, message: String },
}
