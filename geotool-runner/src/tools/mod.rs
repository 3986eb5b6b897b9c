//! Tool endpoints
//!
//! A tool turns endpoint parameters into the input document, environment and
//! command of one container run. `ToolRunner` does the rest: it stages the job
//! directories, writes the input, runs the container through the lifecycle
//! controller and reports the outcome.

mod dataset_profiler;
mod variogram;
mod vforwater_loader;
mod whitebox;

pub use dataset_profiler::DatasetProfiler;
pub use variogram::Variogram;
pub use vforwater_loader::VforwaterLoader;
pub use whitebox::WhiteboxGis;

use geotool_core::{ContainerSpec, ToolOutputs};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use tracing::{error, info};

use crate::config::RunnerConfig;
use crate::connection::RuntimeConnection;
use crate::error::ToolError;
use crate::lifecycle::LifecycleController;
use crate::reporter;
use crate::staging::{JobStaging, StagedJob};

/// Default name of the JSON input document in `/in`
pub const DEFAULT_INPUT_FILE: &str = "inputs.json";

/// Command that starts the tool inside the standard tool images
pub(crate) const RUN_SCRIPT: [&str; 2] = ["python", "/src/run.py"];

/// Everything a tool contributes to its container run
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Written to `/in/<input file>`
    pub input: JsonValue,
    pub environment: BTreeMap<String, String>,
    /// Empty runs the image default
    pub command: Vec<String>,
}

impl Invocation {
    pub fn new(input: JsonValue) -> Self {
        Self {
            input,
            environment: BTreeMap::new(),
            command: Vec::new(),
        }
    }

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
}

/// A containerized tool exposed as an endpoint
pub trait Tool: Send + Sync {
    /// Endpoint id, also the prefix of job directories and container names
    fn id(&self) -> &'static str;

    fn default_image(&self) -> &'static str;

    /// Name of the input document written into `/in`
    fn input_file(&self) -> &'static str {
        DEFAULT_INPUT_FILE
    }

    /// Validates parameters and builds the invocation
    ///
    /// May copy data files into the job's input directory.
    fn prepare(
        &self,
        params: &JsonValue,
        job: &StagedJob,
        config: &RunnerConfig,
    ) -> Result<Invocation, ToolError>;
}

/// Ids of every available tool
pub const TOOL_IDS: [&str; 4] = [
    whitebox::TOOL_ID,
    vforwater_loader::TOOL_ID,
    variogram::TOOL_ID,
    dataset_profiler::TOOL_ID,
];

/// Looks a tool up by endpoint id
pub fn find_tool(id: &str) -> Result<Box<dyn Tool>, ToolError> {
    match id {
        whitebox::TOOL_ID => Ok(Box::new(WhiteboxGis)),
        vforwater_loader::TOOL_ID => Ok(Box::new(VforwaterLoader)),
        variogram::TOOL_ID => Ok(Box::new(Variogram)),
        dataset_profiler::TOOL_ID => Ok(Box::new(DatasetProfiler)),
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

/// Runs tools end to end
#[derive(Debug, Clone)]
pub struct ToolRunner {
    config: RunnerConfig,
    staging: JobStaging,
    controller: LifecycleController,
}

impl ToolRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            staging: JobStaging::new(&config),
            controller: LifecycleController::new(config.lifecycle_options()),
            config,
        }
    }

    pub fn staging(&self) -> &JobStaging {
        &self.staging
    }

    pub fn controller(&self) -> &LifecycleController {
        &self.controller
    }

    /// Executes a tool
    ///
    /// # Arguments
    /// * `connection` - Probed daemon connection
    /// * `tool` - Tool to run
    /// * `params` - Endpoint parameters (a JSON object)
    /// * `user` - Requesting user, if known
    ///
    /// # Errors
    /// Parameter, configuration and staging problems. Anything that goes
    /// wrong once the container is submitted is reported in the outputs.
    pub async fn execute(
        &self,
        connection: &RuntimeConnection,
        tool: &dyn Tool,
        params: &JsonValue,
        user: Option<&str>,
    ) -> Result<ToolOutputs, ToolError> {
        info!("Started execution of {}", tool.id());

        let job = self.staging.stage(tool.id(), user)?;

        let invocation = match tool
            .prepare(params, &job, &self.config)
            .and_then(|inv| {
                job.write_parameters(tool.input_file(), &inv.input)?;
                Ok(inv)
            }) {
            Ok(invocation) => invocation,
            Err(e) => {
                error!("Failed to prepare {}: {}", tool.id(), e);
                self.staging.discard(&job);
                return Err(e);
            }
        };

        // Container and job directory share the job id
        let spec = ContainerSpec::new(
            self.config.image_for(tool.id(), tool.default_image()),
            job.id(),
        )
        .with_mounts(job.mounts())
        .with_network_mode(self.config.network_mode.clone())
        .with_command(invocation.command);

        let spec = invocation
            .environment
            .into_iter()
            .fold(spec, |spec, (key, value)| spec.with_env(key, value));

        let result = self.controller.run(connection, &spec).await;
        let outputs = reporter::report(&result, &job.output_dir());

        info!(
            "Finished execution of {}: {} ({})",
            tool.id(),
            outputs.container_status,
            job.id()
        );
        Ok(outputs)
    }
}

/// Parameters as a JSON object
pub(crate) fn object(params: &JsonValue) -> Result<&Map<String, JsonValue>, ToolError> {
    params
        .as_object()
        .ok_or_else(|| ToolError::InvalidParameters("expected a JSON object".to_string()))
}

/// A parameter that must be present and not null
pub(crate) fn required<'a>(
    params: &'a Map<String, JsonValue>,
    key: &str,
) -> Result<&'a JsonValue, ToolError> {
    params
        .get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| ToolError::InvalidParameters(format!("missing required input '{}'", key)))
}

/// A required string parameter
pub(crate) fn required_str<'a>(
    params: &'a Map<String, JsonValue>,
    key: &str,
) -> Result<&'a str, ToolError> {
    required(params, key)?
        .as_str()
        .ok_or_else(|| ToolError::InvalidParameters(format!("'{}' must be a string", key)))
}
