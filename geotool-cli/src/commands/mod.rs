//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod container;
mod results;
mod tool;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Check that the podman service answers
    Ping,
    /// List available tools
    Tools,
    /// Run a tool and print its outputs as JSON
    Run {
        /// Tool id (e.g., whiteboxgis_tool, variogram)
        tool: String,

        /// Requesting user, used for the job directories
        #[arg(short, long)]
        user: Option<String>,

        /// Tool parameter as key=value, value parsed as JSON where possible
        #[arg(short, long = "param")]
        params: Vec<String>,
    },
    /// Force-remove a retained container
    Remove {
        /// Container name
        name: String,
    },
    /// Delete job result folders
    Clean {
        /// Job input folder
        #[arg(long = "input")]
        input_folders: Vec<String>,

        /// Job output folder
        #[arg(long = "output")]
        output_folders: Vec<String>,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Ping => container::ping(config).await,
        Commands::Tools => tool::list_tools(),
        Commands::Run { tool, user, params } => {
            tool::run_tool(config, &tool, user.as_deref(), &params).await
        }
        Commands::Remove { name } => container::remove(config, &name).await,
        Commands::Clean {
            input_folders,
            output_folders,
        } => results::clean(config, &input_folders, &output_folders),
    }
}
