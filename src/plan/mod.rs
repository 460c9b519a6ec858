//! Plan module for the deployment orchestrator.
//!
//! This module holds everything about the desired state of a mission:
//! - The plan document schema (`YAML` or `JSON`)
//! - The in-memory `Plan` and `DeploymentUnit` model
//! - Structured configuration values written next to installed appliances
//! - The factory that builds plans and assigns repository versions

mod document;
mod factory;
mod model;
mod value;

pub use document::{PlanDocument, UnitDocument};
pub use factory::{repository_version_for, PlanDefaults, PlanFactory};
pub use model::{DeploymentUnit, Plan, ENVIRONMENT_CONFIG_FILE, MISSION_CONFIG_FILE};
pub use value::{find_non_finite, ConfigTree, ConfigValue};
