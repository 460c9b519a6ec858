//! Status document types.
//!
//! A [`PlanStatus`] is the observable result of a reconciliation pass. It is
//! intended for health polling, not as a command channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::plan::{DeploymentUnit, Plan};

/// Current version of the status format.
pub const STATUS_VERSION: &str = "1.0";

/// Resulting state of one reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanStatus {
    /// Status format version.
    pub version: String,
    /// Mission name.
    pub mission: String,
    /// Repository version the pass ran against.
    pub repository_version: String,
    /// Installation root.
    pub installation_root: PathBuf,
    /// Identifier of the pass that produced this status.
    pub pass_id: Uuid,
    /// When the pass completed.
    pub completed_at: DateTime<Utc>,
    /// Per-unit results in plan order.
    pub units: Vec<UnitStatus>,
}

/// Resulting state of one deployment unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitStatus {
    /// Unit alias.
    pub alias: String,
    /// Build label.
    pub build: String,
    /// Whether the unit was marked for deployment.
    pub deploy: bool,
    /// Whether the artifact was fetched and verified.
    pub has_loaded: bool,
    /// Whether the artifact and its configuration were installed.
    pub has_installed: bool,
    /// Installation directory.
    pub installation_location: PathBuf,
}

impl PlanStatus {
    /// Captures the status of a plan after a pass.
    #[must_use]
    pub fn from_plan(plan: &Plan) -> Self {
        Self {
            version: STATUS_VERSION.to_string(),
            mission: plan.name.clone(),
            repository_version: plan.repository_version.clone(),
            installation_root: plan.installation_root.clone(),
            pass_id: Uuid::new_v4(),
            completed_at: Utc::now(),
            units: plan.deployments.iter().map(UnitStatus::from).collect(),
        }
    }

    /// Returns true when every deployable unit was installed.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.units.iter().filter(|u| u.deploy).all(|u| u.has_installed)
    }

    /// Returns the status of the unit with the given alias.
    #[must_use]
    pub fn unit(&self, alias: &str) -> Option<&UnitStatus> {
        self.units.iter().find(|u| u.alias == alias)
    }
}

impl From<&DeploymentUnit> for UnitStatus {
    fn from(unit: &DeploymentUnit) -> Self {
        Self {
            alias: unit.alias.clone(),
            build: unit.build.clone(),
            deploy: unit.deploy,
            has_loaded: unit.has_loaded,
            has_installed: unit.has_installed,
            installation_location: unit.installation_location.clone(),
        }
    }
}
