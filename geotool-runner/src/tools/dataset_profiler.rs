//! Dataset profiler
//!
//! Produces a statistical profile report of a tabular dataset.

use serde_json::{Value as JsonValue, json};
use std::path::Path;

use super::{Invocation, Tool, object, required_str};
use crate::config::RunnerConfig;
use crate::error::ToolError;
use crate::staging::StagedJob;

pub(crate) const TOOL_ID: &str = "dataset_profiler";

#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetProfiler;

impl Tool for DatasetProfiler {
    fn id(&self) -> &'static str {
        TOOL_ID
    }

    fn default_image(&self) -> &'static str {
        "ghcr.io/vforwater/tbr_profile:latest"
    }

    fn prepare(
        &self,
        params: &JsonValue,
        job: &StagedJob,
        _config: &RunnerConfig,
    ) -> Result<Invocation, ToolError> {
        let params = object(params)?;
        let df = required_str(params, "df")?;

        let df_in_container = job.copy_input(Path::new(df))?;

        let input = json!({
            "profile": {
                "data": {
                    "df": df_in_container
                }
            }
        });

        Ok(Invocation::new(input).with_env("TOOL_RUN", "profile"))
    }
}
