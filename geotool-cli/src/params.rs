//! Tool parameter parsing
//!
//! `--param key=value` pairs are collected into the JSON object a tool
//! endpoint receives. Values are read as JSON where they parse, so
//! `n_lags=10` is a number and `raster_ids=[1,2]` a list; anything else is
//! kept as a plain string.

use anyhow::{Result, bail};
use serde_json::{Map, Value as JsonValue};

/// Parses one `key=value` argument
pub fn parse_param(arg: &str) -> Result<(String, JsonValue)> {
    let Some((key, value)) = arg.split_once('=') else {
        bail!("Invalid parameter '{}': expected key=value", arg);
    };

    let key = key.trim();
    if key.is_empty() {
        bail!("Invalid parameter '{}': empty key", arg);
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| JsonValue::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Builds the parameter object, later keys override earlier ones
pub fn parse_params(args: &[String]) -> Result<JsonValue> {
    let mut params = Map::new();
    for arg in args {
        let (key, value) = parse_param(arg)?;
        params.insert(key, value);
    }
    Ok(JsonValue::Object(params))
}
