//! Installer module for the deployment orchestrator.
//!
//! This module turns loaded artifact bytes into a runnable installation:
//! - Resetting the installation root before a pass
//! - Extracting zip artifacts into each unit's directory
//! - Writing the unit's environment and mission configuration files

mod appliance;
mod archive;

pub use appliance::ApplianceInstaller;
pub use archive::extract_zip;
