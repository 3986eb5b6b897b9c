//! Geotool Runner
//!
//! Runs containerized geoscience tools on a podman service:
//! - Secrets file and runner configuration
//! - Runtime connection manager with a liveness probe
//! - Container lifecycle controller (conflict cleanup, launch, wait, logs)
//! - Per-job directory staging and result removal
//! - Tool endpoints and the result reporter

pub mod config;
pub mod connection;
pub mod error;
pub mod lifecycle;
pub mod reporter;
pub mod runtime;
pub mod secrets;
pub mod staging;
pub mod tools;

pub use config::{MetacatalogConfig, RunnerConfig};
pub use connection::{RuntimeConnection, connect};
pub use error::{ConfigError, RuntimeError, StagingError, ToolError};
pub use lifecycle::{LifecycleController, LifecycleOptions, RemovalPolicy};
pub use runtime::{ContainerRuntime, PodmanRuntime};
pub use secrets::Secrets;
pub use staging::{JobStaging, StagedJob};
pub use tools::{Tool, ToolRunner, find_tool};
