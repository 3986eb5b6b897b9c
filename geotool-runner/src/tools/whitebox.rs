//! WhiteboxGIS terrain analysis tool

use serde_json::{Value as JsonValue, json};

use super::{Invocation, RUN_SCRIPT, Tool, object};
use crate::config::RunnerConfig;
use crate::error::ToolError;
use crate::staging::StagedJob;

pub(crate) const TOOL_ID: &str = "whiteboxgis_tool";

/// Raster used when the caller does not name one
pub const DEFAULT_INPUT_RASTER: &str = "/data/example_inputs/elevation.tif";

#[derive(Debug, Clone, Copy, Default)]
pub struct WhiteboxGis;

impl Tool for WhiteboxGis {
    fn id(&self) -> &'static str {
        TOOL_ID
    }

    fn default_image(&self) -> &'static str {
        "tool_whiteboxgis:latest"
    }

    fn prepare(
        &self,
        params: &JsonValue,
        _job: &StagedJob,
        _config: &RunnerConfig,
    ) -> Result<Invocation, ToolError> {
        let params = object(params)?;

        let input_raster = match params.get("input_raster") {
            None | Some(JsonValue::Null) => DEFAULT_INPUT_RASTER,
            Some(JsonValue::String(raster)) => raster.as_str(),
            Some(_) => {
                return Err(ToolError::InvalidParameters(
                    "'input_raster' must be a path".to_string(),
                ));
            }
        };

        let input = json!({
            TOOL_ID: {
                "parameters": {
                    "input_raster": input_raster
                }
            }
        });

        Ok(Invocation::new(input).with_command(RUN_SCRIPT))
    }
}
