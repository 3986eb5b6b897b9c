//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::container::ContainerStatus;
use crate::error::LifecycleError;

/// Placeholder log text when logs could not be collected
pub const NO_LOGS: &str = "No logs available";

/// Outcome of one container run
///
/// Produced once by the lifecycle controller and never modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    /// Name of the container the job ran in
    pub container: String,
    /// Authoritative status from the final daemon state read
    pub status: ContainerStatus,
    /// Exit code reported by the wait primitive, if the wait completed
    pub exit_code: Option<i64>,
    /// Decoded log lines, concatenated in emission order
    pub log_text: String,
    /// Step failures in the order they happened
    pub errors: Vec<LifecycleError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobResult {
    /// Joined diagnostics of every failed step, `None` for a clean run
    pub fn error_detail(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }

        Some(
            self.errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(" | "),
        )
    }

    /// True when the container reached the exited state
    ///
    /// The tool's own exit code is not considered.
    pub fn completed(&self) -> bool {
        self.status == ContainerStatus::Exited
    }
}
