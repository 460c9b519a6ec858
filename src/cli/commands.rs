//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Appliance deployment orchestrator.
#[derive(Parser, Debug)]
#[command(name = "appliance-deploy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "APPLIANCE_DEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log line format (text, json).
    #[arg(long, global = true, default_value = "text", env = "APPLIANCE_DEPLOY_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the plan source and reconcile until interrupted.
    Run,

    /// Run a single reconciliation pass.
    Once {
        /// Reconcile even if the plan has not changed.
        #[arg(short, long)]
        force: bool,
    },

    /// Parse a plan document and print a summary without side effects.
    Validate {
        /// Plan document (YAML or JSON).
        plan: PathBuf,
    },

    /// Show the status written by the last successful pass.
    Status,

    /// Print the SHA-256 checksum of an artifact, as expected in plans.
    Checksum {
        /// Artifact file.
        file: PathBuf,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log line formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}
