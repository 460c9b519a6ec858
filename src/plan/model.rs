//! In-memory plan model.
//!
//! A [`Plan`] is rebuilt from the plan document on every reconciliation pass.
//! Its [`DeploymentUnit`]s carry the artifact buffer and the lifecycle flags
//! that the loader and installer set as the pass progresses.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use super::value::ConfigTree;

/// File name of the environment configuration written next to an appliance.
pub const ENVIRONMENT_CONFIG_FILE: &str = "environment.json";

/// File name of the mission configuration written next to an appliance.
pub const MISSION_CONFIG_FILE: &str = "mission.json";

/// The desired, and after a pass the actual, deployment state of a mission.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Mission identifier.
    pub name: String,
    /// Local root under which repository version directories are cached.
    pub repository_root: PathBuf,
    /// Cache generation tag, empty until assigned.
    pub repository_version: String,
    /// Root under which appliances are installed.
    pub installation_root: PathBuf,
    /// Backend root passed to the artifact fetcher.
    pub artifact_root: String,
    /// Hex SHA-256 digest of the plan document this plan was parsed from.
    pub content_digest: String,
    /// Deployment units in declared order.
    pub deployments: Vec<DeploymentUnit>,
}

/// One deployable artifact plus its configuration.
#[derive(Debug, Clone, Default)]
pub struct DeploymentUnit {
    /// Short identity, also the default installation directory name.
    pub alias: String,
    /// Display name.
    pub name: String,
    /// Build or version label.
    pub build: String,
    /// Artifact address within the artifact root.
    pub repository_location: String,
    /// Expected hex SHA-256 of the artifact, blank when unchecked.
    pub checksum: String,
    /// Whether this unit takes part in the pass at all.
    pub deploy: bool,
    /// Artifact bytes populated by the loader and released by the installer.
    pub repository_content: Cursor<Vec<u8>>,
    /// Environment configuration tree.
    pub environment_configuration: ConfigTree,
    /// Mission configuration tree.
    pub mission_configuration: ConfigTree,
    /// Directory the artifact is extracted into.
    pub installation_location: PathBuf,
    /// Target path of the environment configuration file.
    pub environment_config_location: PathBuf,
    /// Target path of the mission configuration file.
    pub mission_config_location: PathBuf,
    /// Set once fetch and checksum verification succeed.
    pub has_loaded: bool,
    /// Set once extraction and both configuration writes succeed.
    pub has_installed: bool,
}

impl Plan {
    /// Returns the directory holding cached artifacts for the current repository version.
    #[must_use]
    pub fn repository_version_dir(&self) -> PathBuf {
        self.repository_root.join(&self.repository_version)
    }

    /// Returns the unit with the given alias.
    #[must_use]
    pub fn unit(&self, alias: &str) -> Option<&DeploymentUnit> {
        self.deployments.iter().find(|u| u.alias == alias)
    }

    /// Returns the number of units marked for deployment.
    #[must_use]
    pub fn deployable_count(&self) -> usize {
        self.deployments.iter().filter(|u| u.deploy).count()
    }

    /// Returns the number of units installed during the pass.
    #[must_use]
    pub fn installed_count(&self) -> usize {
        self.deployments.iter().filter(|u| u.has_installed).count()
    }

    /// Returns the number of units loaded during the pass.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.deployments.iter().filter(|u| u.has_loaded).count()
    }
}

impl DeploymentUnit {
    /// Creates a deployable unit with locations derived from the installation root.
    #[must_use]
    pub fn new(alias: &str, build: &str, repository_location: &str, installation_root: &Path) -> Self {
        let installation_location = installation_root.join(alias);
        Self {
            alias: alias.to_string(),
            name: alias.to_string(),
            build: build.to_string(),
            repository_location: repository_location.to_string(),
            deploy: true,
            environment_config_location: installation_location.join(ENVIRONMENT_CONFIG_FILE),
            mission_config_location: installation_location.join(MISSION_CONFIG_FILE),
            installation_location,
            ..Self::default()
        }
    }

    /// Returns the number of buffered artifact bytes.
    #[must_use]
    pub fn content_len(&self) -> usize {
        self.repository_content.get_ref().len()
    }

    /// Replaces the buffered artifact bytes and rewinds to the start.
    pub fn set_content(&mut self, bytes: Vec<u8>) {
        self.repository_content = Cursor::new(bytes);
    }

    /// Takes the buffered bytes out of the unit, leaving an empty rewound buffer.
    pub fn take_content(&mut self) -> Vec<u8> {
        let bytes = std::mem::take(self.repository_content.get_mut());
        self.repository_content.set_position(0);
        bytes
    }

    /// Truncates the buffer to zero length.
    pub fn release_content(&mut self) {
        self.repository_content.get_mut().clear();
        self.repository_content.get_mut().shrink_to_fit();
        self.repository_content.set_position(0);
    }

    /// Returns true when a checksum is configured for this unit.
    #[must_use]
    pub fn has_checksum(&self) -> bool {
        !self.checksum.trim().is_empty()
    }

    /// Returns a short `alias@build` label for logs.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}@{}", self.alias, self.build)
    }
}
