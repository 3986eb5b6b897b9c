//! Variogram estimation and model fitting
//!
//! Endpoint callers pick options by their display labels (e.g. "Scott’s rule");
//! the tool image expects the short option names (e.g. "scott"). Option names
//! are accepted as well.

use serde_json::{Map, Value as JsonValue, json};
use std::path::Path;

use super::{Invocation, Tool, object, required, required_str};
use crate::config::RunnerConfig;
use crate::error::ToolError;
use crate::staging::StagedJob;

pub(crate) const TOOL_ID: &str = "variogram";

const BIN_FUNCTIONS: &[(&str, &str)] = &[
    ("Even", "even"),
    ("Uniform", "uniform"),
    ("Freedman-Diaconis estimator", "fd"),
    ("Sturge’s rule", "sturges"),
    ("Scott’s rule", "scott"),
    ("Doane’s extension", "doane"),
    ("Square-root of distance", "sqrt"),
    ("KMeans clustering", "kmeans"),
    ("Hierarchical clustering", "ward"),
];

const MODELS: &[(&str, &str)] = &[
    ("Spherical", "spherical"),
    ("Exponential", "exponential"),
    ("Gaussian", "gaussian"),
    ("Cubic", "cubic"),
    ("Stable model", "stable"),
    ("Matérn model", "matern"),
    ("Nugget effect variogram", "nugget"),
];

const ESTIMATORS: &[(&str, &str)] = &[
    ("Matheron estimator", "matheron"),
    ("Cressie-Hawkins", "cressie"),
    ("Dowd-Estimator", "dowd"),
    ("Genton", "genton"),
    ("MinMax Scaler", "minmax"),
    ("Shannon Entropy", "entropy"),
];

const FIT_METHODS: &[(&str, &str)] = &[
    ("Levenberg-Marquardt algorithm", "lm"),
    ("Trust Region Reflective", "trf"),
    ("Maximum-Likelihood estimation", "ml"),
    ("Manual fitting", "manual"),
];

const FIT_SIGMAS: &[(&str, &str)] = &[
    ("None", "None"),
    ("Linear loss with distance", "linear"),
    ("Exponential decrease", "exp"),
    ("Square Root of distance decrease", "sqrt"),
    ("Squared distance decrease", "sq"),
];

/// Minimum number of lag classes
const MIN_LAGS: u64 = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct Variogram;

impl Tool for Variogram {
    fn id(&self) -> &'static str {
        TOOL_ID
    }

    fn default_image(&self) -> &'static str {
        "ghcr.io/vforwater/tbr_skgstat:latest"
    }

    fn input_file(&self) -> &'static str {
        "parameters.json"
    }

    fn prepare(
        &self,
        params: &JsonValue,
        job: &StagedJob,
        _config: &RunnerConfig,
    ) -> Result<Invocation, ToolError> {
        let params = object(params)?;

        let coordinates = required_str(params, "coordinates")?;
        let values = required_str(params, "values")?;

        let n_lags = required(params, "n_lags")?
            .as_u64()
            .filter(|n| *n >= MIN_LAGS)
            .ok_or_else(|| {
                ToolError::InvalidParameters(format!(
                    "'n_lags' must be an integer of at least {}",
                    MIN_LAGS
                ))
            })?;

        let bin_func = option(params, "bin_func", BIN_FUNCTIONS)?;
        let model = option(params, "model", MODELS)?;
        let estimator = option(params, "estimator", ESTIMATORS)?;
        let fit_method = option(params, "fit_method", FIT_METHODS)?;

        let use_nugget = required(params, "use_nugget")?
            .as_bool()
            .ok_or_else(|| ToolError::InvalidParameters("'use_nugget' must be a boolean".to_string()))?;

        // A string sigma names a weighting function, an array gives per-lag weights
        let fit_sigma = match params.get("fit_sigma") {
            Some(JsonValue::String(label)) => {
                JsonValue::String(lookup(label, FIT_SIGMAS, "fit_sigma")?.to_string())
            }
            Some(other) => other.clone(),
            None => JsonValue::Null,
        };

        let coords = job.copy_input(Path::new(coordinates))?;
        let values = job.copy_input(Path::new(values))?;

        let optional = |key: &str| params.get(key).cloned().unwrap_or(JsonValue::Null);

        let input = json!({
            TOOL_ID: {
                "coords": coords,
                "values": values,
                "n_lags": n_lags,
                "bin_func": bin_func,
                "model": model,
                "estimator": estimator,
                "maxlag": optional("maxlag"),
                "fit_method": fit_method,
                "use_nugget": use_nugget,
                "fit_range": optional("fit_range"),
                "fit_sill": optional("fit_sill"),
                "fit_nugget": optional("fit_nugget"),
                "fit_sigma": fit_sigma
            }
        });

        Ok(Invocation::new(input).with_env("TOOL_RUN", TOOL_ID))
    }
}

/// Resolves a required labelled option to its option name
fn option(
    params: &Map<String, JsonValue>,
    key: &str,
    table: &[(&str, &'static str)],
) -> Result<&'static str, ToolError> {
    lookup(required_str(params, key)?, table, key)
}

fn lookup(
    label: &str,
    table: &[(&str, &'static str)],
    key: &str,
) -> Result<&'static str, ToolError> {
    table
        .iter()
        .find(|(display, name)| *display == label || *name == label)
        .map(|(_, name)| *name)
        .ok_or_else(|| {
            ToolError::InvalidParameters(format!("unknown {} '{}'", key, label))
        })
}
