//! Endpoint output types
//!
//! The JSON documents returned to callers of a tool endpoint.

use serde::{Deserialize, Serialize};

/// Coarse job outcome reported to the endpoint caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeValue {
    Completed,
    Failed,
}

/// Result object of a tool endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutputs {
    /// Last known daemon status of the container (e.g., "exited")
    pub container_status: String,
    pub value: OutcomeValue,
    /// Server-visible output directory
    pub dir: String,
    /// Diagnostics, "none" when nothing failed
    pub error: String,
    pub tool_logs: String,
}

/// Outcome of deleting job result folders
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalReport {
    pub removed: Vec<String>,
    pub not_removed: Vec<String>,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outputs_wire_shape() {
        let outputs = ToolOutputs {
            container_status: "exited".to_string(),
            value: OutcomeValue::Completed,
            dir: "/srv/out/u/job".to_string(),
            error: "none".to_string(),
            tool_logs: "done\n".to_string(),
        };

        let json = serde_json::to_value(&outputs).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "container_status": "exited",
                "value": "completed",
                "dir": "/srv/out/u/job",
                "error": "none",
                "tool_logs": "done\n"
            })
        );
    }
}
