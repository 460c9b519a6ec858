//! Plan document schema.
//!
//! These types map one-to-one onto the YAML or JSON plan document published
//! for a mission. They are converted into the [`Plan`](super::Plan) model by
//! the [`PlanFactory`](super::PlanFactory).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::PlanError;

use super::value::{find_non_finite, ConfigTree};

/// Root of a plan document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanDocument {
    /// Mission name.
    pub mission: String,
    /// Local cache root for repository versions.
    #[serde(default)]
    pub repository_root: Option<PathBuf>,
    /// Root under which appliances are installed.
    #[serde(default)]
    pub installation_root: Option<PathBuf>,
    /// Backend root passed to the artifact fetcher.
    #[serde(default)]
    pub artifact_root: Option<String>,
    /// Deployment units in order.
    #[serde(default)]
    pub deployments: Vec<UnitDocument>,
}

/// A single deployment unit in a plan document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitDocument {
    /// Unique alias.
    pub alias: String,
    /// Display name, defaults to the alias.
    #[serde(default)]
    pub name: Option<String>,
    /// Build label.
    #[serde(default)]
    pub build: String,
    /// Artifact key within the artifact root.
    #[serde(default, alias = "repository_location")]
    pub key: String,
    /// Expected hex SHA-256 of the artifact.
    #[serde(default)]
    pub checksum: String,
    /// Whether the unit is deployed.
    #[serde(default = "default_deploy")]
    pub deploy: bool,
    /// Environment configuration tree.
    #[serde(default)]
    pub environment_configuration: ConfigTree,
    /// Mission configuration tree.
    #[serde(default)]
    pub mission_configuration: ConfigTree,
    /// Installation directory override.
    #[serde(default)]
    pub installation_location: Option<PathBuf>,
    /// Environment configuration file override.
    #[serde(default)]
    pub environment_config_location: Option<PathBuf>,
    /// Mission configuration file override.
    #[serde(default)]
    pub mission_config_location: Option<PathBuf>,
}

const fn default_deploy() -> bool {
    true
}

impl PlanDocument {
    /// Checks the document for problems that parsing alone does not catch.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.mission.trim().is_empty() {
            return Err(PlanError::invalid("mission", "Mission name cannot be empty"));
        }

        let mut seen = HashSet::new();
        for (i, unit) in self.deployments.iter().enumerate() {
            let field = format!("deployments[{i}]");

            if !is_valid_alias(&unit.alias) {
                return Err(PlanError::invalid(
                    format!("{field}.alias"),
                    format!(
                        "Alias '{}' is invalid. Must be alphanumeric with '-', '_' or '.', not starting with '.'",
                        unit.alias
                    ),
                ));
            }

            if !seen.insert(unit.alias.as_str()) {
                return Err(PlanError::invalid(
                    format!("{field}.alias"),
                    format!("Duplicate alias '{}'", unit.alias),
                ));
            }

            if unit.deploy && unit.key.trim().is_empty() {
                return Err(PlanError::invalid(
                    format!("{field}.key"),
                    format!("Appliance '{}' is deployed but has no repository key", unit.alias),
                ));
            }

            if !is_contained_key(&unit.key) {
                return Err(PlanError::invalid(
                    format!("{field}.key"),
                    format!("Key '{}' must not contain '..' segments", unit.key),
                ));
            }

            let trees = [
                ("environment_configuration", &unit.environment_configuration),
                ("mission_configuration", &unit.mission_configuration),
            ];
            for (name, tree) in trees {
                if let Some(path) = find_non_finite(tree) {
                    return Err(PlanError::invalid(
                        format!("{field}.{name}.{path}"),
                        "NaN and infinite values cannot be written as JSON",
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Aliases name a directory under the installation root, so they must be a
/// single safe path segment.
fn is_valid_alias(alias: &str) -> bool {
    if alias.is_empty() || alias.starts_with('.') {
        return false;
    }

    alias
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Artifact keys are joined onto a backend root, so they may not climb out of it.
fn is_contained_key(key: &str) -> bool {
    !key.split(['/', '\\']).any(|segment| segment == "..")
}
