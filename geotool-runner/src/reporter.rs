//! Result reporter
//!
//! Turns a `JobResult` into the outputs document returned by tool endpoints.

use geotool_core::{JobResult, OutcomeValue, ToolOutputs};

/// Error field value when no step failed
pub const NO_ERROR: &str = "none";

/// Builds the endpoint outputs for a finished job
///
/// `value` is `completed` exactly when the container reached the exited
/// state, regardless of the tool's exit code.
pub fn report(result: &JobResult, output_dir: &str) -> ToolOutputs {
    ToolOutputs {
        container_status: result.status.to_string(),
        value: if result.completed() {
            OutcomeValue::Completed
        } else {
            OutcomeValue::Failed
        },
        dir: output_dir.to_string(),
        error: result
            .error_detail()
            .unwrap_or_else(|| NO_ERROR.to_string()),
        tool_logs: result.log_text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use geotool_core::{ContainerStatus, LifecycleError, NO_LOGS};

    fn result(status: ContainerStatus, errors: Vec<LifecycleError>, logs: &str) -> JobResult {
        JobResult {
            container: "whiteboxgis_tool_0a1b2c3d4e".to_string(),
            status,
            exit_code: None,
            log_text: logs.to_string(),
            errors,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_report_completed() {
        let outputs = report(
            &result(ContainerStatus::Exited, vec![], "slope computed\n"),
            "/srv/out/u/job",
        );

        assert_eq!(outputs.container_status, "exited");
        assert_eq!(outputs.value, OutcomeValue::Completed);
        assert_eq!(outputs.dir, "/srv/out/u/job");
        assert_eq!(outputs.error, NO_ERROR);
        assert_eq!(outputs.tool_logs, "slope computed\n");
    }

    #[test]
    fn test_report_launch_failure() {
        let outputs = report(
            &result(
                ContainerStatus::Failed,
                vec![LifecycleError::Launch {
                    container: "c".to_string(),
                    message: "image not known".to_string(),
                }],
                NO_LOGS,
            ),
            "/srv/out/u/job",
        );

        assert_eq!(outputs.container_status, "failed");
        assert_eq!(outputs.value, OutcomeValue::Failed);
        assert!(outputs.error.contains("image not known"));
        assert_eq!(outputs.tool_logs, NO_LOGS);
    }

    #[test]
    fn test_report_joins_errors() {
        let outputs = report(
            &result(
                ContainerStatus::Unknown,
                vec![
                    LifecycleError::Wait {
                        container: "c".to_string(),
                        message: "connection reset".to_string(),
                    },
                    LifecycleError::LogCollection {
                        container: "c".to_string(),
                        message: "gone".to_string(),
                    },
                ],
                NO_LOGS,
            ),
            "/out",
        );

        assert_eq!(outputs.value, OutcomeValue::Failed);
        assert_eq!(outputs.error.matches(" | ").count(), 1);
    }
}
