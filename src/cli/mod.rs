//! CLI module for the appliance deployment orchestrator.
//!
//! This module provides the command-line interface for running,
//! inspecting, and validating deployments.

mod commands;
mod output;

pub use commands::{Cli, Commands, LogFormat, OutputFormat};
pub use output::OutputFormatter;
