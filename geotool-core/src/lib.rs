//! Geotool Core
//!
//! Core types for the geotool container job orchestrator.
//!
//! This crate contains:
//! - Domain types: container specs, bind mounts, job results, endpoint outputs
//! - Errors: the lifecycle error taxonomy recorded on job results

pub mod domain;
pub mod error;

pub use domain::container::{BindMount, CONTAINER_IN, CONTAINER_OUT, ContainerSpec, ContainerStatus};
pub use domain::job::{JobResult, NO_LOGS};
pub use domain::outputs::{OutcomeValue, RemovalReport, ToolOutputs};
pub use error::LifecycleError;
