//! Tool command handlers
//!
//! Handles listing tools and running them.

use anyhow::{Context, Result};
use colored::*;
use geotool_core::{OutcomeValue, ToolOutputs};
use geotool_runner::tools::TOOL_IDS;
use geotool_runner::{ToolRunner, connect, find_tool};
use std::path::Path;

use crate::config::Config;
use crate::params::parse_params;

/// List available tools
pub fn list_tools() -> Result<()> {
    println!("{}", format!("{} tool(s) available:", TOOL_IDS.len()).bold());
    println!();
    for id in TOOL_IDS {
        let tool = find_tool(id)?;
        println!("  {} {}", "▸".cyan(), id.bold());
        println!("    Image:  {}", tool.default_image().dimmed());
    }
    Ok(())
}

/// Run a tool and print its outputs
///
/// The outputs document goes to stdout as JSON, a short summary to stderr.
pub async fn run_tool(
    config: &Config,
    tool_id: &str,
    user: Option<&str>,
    params: &[String],
) -> Result<()> {
    let tool = find_tool(tool_id)?;
    let params = parse_params(params)?;
    let runner_config = config.runner_config()?;

    let connection = connect(&runner_config.podman_uri, runner_config.connect_timeout)
        .await
        .context("Podman service is not reachable")?;

    let runner = ToolRunner::new(runner_config);
    let outputs = runner
        .execute(&connection, tool.as_ref(), &params, user)
        .await
        .with_context(|| format!("Failed to run {}", tool_id))?;

    print_summary(tool_id, &outputs);
    println!("{}", serde_json::to_string_pretty(&outputs)?);

    Ok(())
}

fn print_summary(tool_id: &str, outputs: &ToolOutputs) {
    let value = match outputs.value {
        OutcomeValue::Completed => "completed".green(),
        OutcomeValue::Failed => "failed".red(),
    };

    eprintln!(
        "{} {} {} (container {})",
        "▸".cyan(),
        tool_id.bold(),
        value,
        outputs.container_status
    );
    // The container carries the job id, the last segment of the results dir
    if let Some(name) = Path::new(&outputs.dir).file_name() {
        eprintln!("  Container: {}", name.to_string_lossy().bold());
    }
    eprintln!("  Results:   {}", outputs.dir.dimmed());
    if outputs.value == OutcomeValue::Failed {
        eprintln!("  Error:     {}", outputs.error.red());
    }
}
