//! Core domain types
//!
//! Shared between the runner library (which produces them) and the CLI
//! (which prints them).

pub mod container;
pub mod job;
pub mod outputs;
