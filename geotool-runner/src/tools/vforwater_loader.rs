//! V-FOR-WaTer dataset loader
//!
//! Pulls timeseries and raster datasets out of the metacatalog and clips them
//! to a reference area. The container reads the catalog directly, so it gets
//! the database URI through its environment.

use serde_json::{Value as JsonValue, json};
use tracing::debug;

use super::{Invocation, RUN_SCRIPT, Tool, object};
use crate::config::RunnerConfig;
use crate::error::{ConfigError, ToolError};
use crate::staging::StagedJob;

pub(crate) const TOOL_ID: &str = "vforwater_loader";

#[derive(Debug, Clone, Copy, Default)]
pub struct VforwaterLoader;

impl Tool for VforwaterLoader {
    fn id(&self) -> &'static str {
        TOOL_ID
    }

    fn default_image(&self) -> &'static str {
        "ghcr.io/vforwater/tbr_vforwater_loader:latest"
    }

    fn prepare(
        &self,
        params: &JsonValue,
        _job: &StagedJob,
        config: &RunnerConfig,
    ) -> Result<Invocation, ToolError> {
        let params = object(params)?;

        let mut dataset_ids = id_list(params.get("timeseries_ids"), "timeseries_ids")?;
        dataset_ids.extend(id_list(params.get("raster_ids"), "raster_ids")?);
        if dataset_ids.is_empty() {
            return Err(ToolError::InvalidParameters(
                "running this tool makes no sense without timeseries or areal dataset".to_string(),
            ));
        }

        let start_date = date(params.get("start_date"), "start_date")?;
        let end_date = date(params.get("end_date"), "end_date")?;

        let reference_area = match params.get("reference_area") {
            None | Some(JsonValue::Null) => json!([]),
            // Forms send the area as a serialized GeoJSON string
            Some(JsonValue::String(area)) => serde_json::from_str(area).map_err(|e| {
                ToolError::InvalidParameters(format!("'reference_area' is not valid JSON: {}", e))
            })?,
            Some(area) => area.clone(),
        };

        let metacatalog = config.metacatalog.as_ref().ok_or_else(|| {
            ConfigError::MissingKey("USER, HOST, PORT and DATABASE".to_string())
        })?;

        debug!(
            "Loading {} dataset(s) from {} to {}",
            dataset_ids.len(),
            start_date,
            end_date
        );

        let input = json!({
            TOOL_ID: {
                "parameters": {
                    "dataset_ids": dataset_ids,
                    "start_date": start_date,
                    "end_date": end_date,
                    "reference_area": reference_area
                }
            }
        });

        Ok(Invocation::new(input)
            .with_env("METACATALOG_URI", metacatalog.uri())
            .with_command(RUN_SCRIPT))
    }
}

fn id_list(value: Option<&JsonValue>, key: &str) -> Result<Vec<JsonValue>, ToolError> {
    match value {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::Array(ids)) => Ok(ids.clone()),
        Some(_) => Err(ToolError::InvalidParameters(format!(
            "'{}' must be a list of dataset ids",
            key
        ))),
    }
}

fn date<'a>(value: Option<&'a JsonValue>, key: &str) -> Result<&'a str, ToolError> {
    match value {
        None | Some(JsonValue::Null) => Ok(""),
        Some(JsonValue::String(date)) => Ok(date.as_str()),
        Some(_) => Err(ToolError::InvalidParameters(format!(
            "'{}' must be a date string",
            key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetacatalogConfig;
    use crate::staging::JobStaging;

    fn config(root: &tempfile::TempDir) -> RunnerConfig {
        let mut config = RunnerConfig::new(root.path());
        config.metacatalog = Some(MetacatalogConfig {
            user: "postgres".to_string(),
            host: "localhost".to_string(),
            port: "5432".to_string(),
            database: "metacatalog".to_string(),
        });
        config
    }

    #[test]
    fn test_prepare_merges_dataset_ids() {
        let root = tempfile::tempdir().unwrap();
        let config = config(&root);
        let job = JobStaging::new(&config).stage(TOOL_ID, None).unwrap();

        let inv = VforwaterLoader
            .prepare(
                &json!({
                    "timeseries_ids": [1, 2],
                    "raster_ids": [42],
                    "start_date": "2010-01-01",
                    "end_date": "2015-12-31",
                    "reference_area": "{\"type\": \"Polygon\", \"coordinates\": []}"
                }),
                &job,
                &config,
            )
            .unwrap();

        let params = &inv.input["vforwater_loader"]["parameters"];
        assert_eq!(params["dataset_ids"], json!([1, 2, 42]));
        assert_eq!(params["start_date"], "2010-01-01");
        assert_eq!(params["reference_area"]["type"], "Polygon");
        assert_eq!(
            inv.environment.get("METACATALOG_URI").map(String::as_str),
            Some("postgresql://postgres@localhost:5432/metacatalog")
        );
        assert_eq!(inv.command, vec!["python", "/src/run.py"]);
    }

    #[test]
    fn test_prepare_requires_datasets() {
        let root = tempfile::tempdir().unwrap();
        let config = config(&root);
        let job = JobStaging::new(&config).stage(TOOL_ID, None).unwrap();

        let err = VforwaterLoader
            .prepare(&json!({"timeseries_ids": [], "start_date": "2010-01-01"}), &job, &config)
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }

    #[test]
    fn test_prepare_rejects_bad_reference_area() {
        let root = tempfile::tempdir().unwrap();
        let config = config(&root);
        let job = JobStaging::new(&config).stage(TOOL_ID, None).unwrap();

        let err = VforwaterLoader
            .prepare(&json!({"raster_ids": [3], "reference_area": "{not json"}), &job, &config)
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }

    #[test]
    fn test_prepare_needs_metacatalog() {
        let root = tempfile::tempdir().unwrap();
        let config = RunnerConfig::new(root.path());
        let job = JobStaging::new(&config).stage(TOOL_ID, None).unwrap();

        let err = VforwaterLoader
            .prepare(&json!({"raster_ids": [3]}), &job, &config)
            .unwrap_err();
        assert!(matches!(err, ToolError::Config(ConfigError::MissingKey(_))));
    }
}
