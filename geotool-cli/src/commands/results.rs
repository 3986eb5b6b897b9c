//! Result folder command handlers

use anyhow::Result;
use colored::*;
use geotool_runner::ToolRunner;

use crate::config::Config;

/// Delete job result folders and print what happened
pub fn clean(config: &Config, input_folders: &[String], output_folders: &[String]) -> Result<()> {
    let runner_config = config.runner_config()?;
    let report = ToolRunner::new(runner_config)
        .staging()
        .remove_results(input_folders, output_folders);

    if report.removed.is_empty() && report.not_removed.is_empty() {
        println!("{}", "Nothing to remove.".yellow());
        return Ok(());
    }

    for folder in &report.removed {
        println!("  {} {}", "✓".green(), folder);
    }
    for error in &report.errors {
        println!("  {} {}", "✗".red(), error);
    }

    println!();
    println!(
        "{}",
        format!(
            "Removed {} folder(s), {} not removed",
            report.removed.len(),
            report.not_removed.len()
        )
        .bold()
    );

    Ok(())
}
