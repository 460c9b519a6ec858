// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![forbid(unsafe_code)]               // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(dead_code)]                   // Unused code is flagged
#![warn(unused_imports)]              // Unused imports are flagged
#![warn(unused_variables)]            // Unused variables are flagged
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Appliance Deploy
//!
//! A deployment orchestrator that keeps a host's installed appliances in step
//! with a declarative, remotely stored deployment plan.
//!
//! ## Overview
//!
//! On every poll the orchestrator:
//!
//! - Asks the plan source whether a newer plan document exists
//! - Parses it into a [`plan::Plan`] with a content-addressed repository version
//! - Cleans stale artifact caches and the installation root
//! - Fetches, checksum-verifies, and extracts each enabled appliance in order
//! - Writes each appliance's environment and mission configuration
//! - Publishes the resulting status for health polling
//!
//! ## Architecture
//!
//! The pieces are small and pluggable:
//!
//! 1. **Plan source**: local file, S3 object, or HTTP configuration service
//! 2. **Loader**: fetches artifacts through a storage strategy (filesystem or S3)
//! 3. **Installer**: extracts zip artifacts and writes configuration files
//! 4. **Writer**: publishes status to a local file or S3
//! 5. **Orchestrator**: composes the four and runs one pass per detected update
//!
//! ## Modules
//!
//! - [`config`]: Orchestrator settings parsing and validation
//! - [`plan`]: Plan document schema, model, and factory
//! - [`source`]: Plan source backends
//! - [`repository`]: Artifact fetchers, checksums, and the loader
//! - [`installer`]: Archive extraction and configuration writing
//! - [`status`]: Status document and writers
//! - [`orchestrator`]: The reconciliation engine
//! - [`worker`]: The poll loop
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! mission: alpha
//! artifact_root: releases
//! deployments:
//!   - alias: web
//!     build: "1.4.2"
//!     key: web/web-1.4.2.zip
//!     checksum: "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
//!     environment_configuration:
//!       port: 8080
//!   - alias: worker
//!     build: "2.0.0"
//!     key: worker/worker-2.0.0.zip
//!     deploy: false
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod aws;
pub mod cli;
pub mod config;
pub mod error;
pub mod installer;
pub mod orchestrator;
pub mod plan;
pub mod repository;
pub mod source;
pub mod status;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, DeployConfig};
pub use error::{DeployError, Result};
pub use installer::ApplianceInstaller;
pub use orchestrator::{MissionOrchestrator, OrchestratorState, PassOutcome, ReconciliationReport};
pub use plan::{ConfigValue, DeploymentUnit, Plan, PlanFactory};
pub use repository::{ApplianceLoader, ArtifactFetcher, FsArtifactFetcher, S3ArtifactFetcher};
pub use source::{HttpPlanSource, LocalPlanSource, PlanSource, S3PlanSource};
pub use status::{LocalStatusWriter, PlanStatus, PlanWriter, S3StatusWriter};
pub use worker::PollerOptions;
