//! Orchestrator settings types.
//!
//! This module defines the structs that map to the `appliance-deploy.yaml`
//! file: where the plan comes from, where artifacts are fetched from, where
//! appliances are installed, and where status is published.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::plan::PlanDefaults;
use crate::status::STATUS_FILE;

/// Application directory name under the platform data directory.
const APP_DIR: &str = "appliance-deploy";

/// Default poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// The root orchestrator settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct DeployConfig {
    /// Logical mission name. Defaults to the host name.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub mission: Option<String>,
    /// Plan source settings.
    #[serde(default)]
    #[validate(nested)]
    pub source: SourceConfig,
    /// Artifact repository settings.
    #[serde(default)]
    #[validate(nested)]
    pub repository: RepositoryConfig,
    /// Default installation root when the plan does not set one.
    #[serde(default)]
    pub installation_root: Option<PathBuf>,
    /// Status publishing settings.
    #[serde(default)]
    #[validate(nested)]
    pub status: StatusConfig,
    /// Poll loop settings.
    #[serde(default)]
    #[validate(nested)]
    pub poll: PollConfig,
}

/// Plan source settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct SourceConfig {
    /// Backend type.
    #[serde(default)]
    pub backend: SourceBackend,
    /// Plan file path (local backend). May contain `{mission}`.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub path: Option<String>,
    /// S3 bucket name (s3 backend).
    #[serde(default)]
    #[validate(length(min = 3, max = 63))]
    pub bucket: Option<String>,
    /// S3 object key (s3 backend). May contain `{mission}`.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub key: Option<String>,
    /// S3 region (optional, uses AWS default if not specified).
    #[serde(default)]
    pub region: Option<String>,
    /// Configuration service URL (http backend). May contain `{mission}`.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub url: Option<String>,
}

/// Plan source backend types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceBackend {
    /// Plan file on local disk.
    #[default]
    Local,
    /// Plan object in S3.
    S3,
    /// Plan document served by a configuration service.
    Http,
}

/// Artifact repository settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct RepositoryConfig {
    /// Backend type.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Artifact directory (local backend) or key prefix (s3 backend).
    #[serde(default)]
    pub root: Option<String>,
    /// S3 bucket name (s3 backend).
    #[serde(default)]
    #[validate(length(min = 3, max = 63))]
    pub bucket: Option<String>,
    /// S3 region (optional).
    #[serde(default)]
    pub region: Option<String>,
    /// Local directory for repository version caches.
    #[serde(default)]
    pub cache_root: Option<PathBuf>,
}

/// Storage backend types for artifacts and status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Local filesystem.
    #[default]
    Local,
    /// AWS S3.
    S3,
}

/// Status publishing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct StatusConfig {
    /// Backend type.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Status file path (local backend).
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// S3 bucket name (s3 backend).
    #[serde(default)]
    #[validate(length(min = 3, max = 63))]
    pub bucket: Option<String>,
    /// S3 key prefix (optional).
    #[serde(default)]
    pub prefix: Option<String>,
    /// S3 region (optional).
    #[serde(default)]
    pub region: Option<String>,
}

/// Poll loop settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct PollConfig {
    /// Delay between passes in milliseconds.
    #[serde(default = "default_interval_ms")]
    #[validate(range(min = 1))]
    pub interval_ms: u64,
    /// Forces a retry of the same plan after a failed pass.
    #[serde(default)]
    pub reload_on_failure: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            reload_on_failure: false,
        }
    }
}

const fn default_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl PollConfig {
    /// Returns the poll interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl DeployConfig {
    /// Returns the platform data directory used for defaults.
    #[must_use]
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// Returns the local repository cache root.
    #[must_use]
    pub fn repository_root(&self) -> PathBuf {
        self.repository
            .cache_root
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("repository"))
    }

    /// Returns the default installation root.
    #[must_use]
    pub fn installation_root(&self) -> PathBuf {
        self.installation_root
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("appliances"))
    }

    /// Returns the local status file path.
    #[must_use]
    pub fn status_path(&self) -> PathBuf {
        self.status
            .path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join(STATUS_FILE))
    }

    /// Returns the defaults applied to plans that leave roots unspecified.
    ///
    /// For a local repository the configured root is the fetcher's base
    /// directory, so plans default to an empty artifact root.
    #[must_use]
    pub fn plan_defaults(&self) -> PlanDefaults {
        let artifact_root = match self.repository.backend {
            StoreBackend::Local => String::new(),
            StoreBackend::S3 => self.repository.root.clone().unwrap_or_default(),
        };

        PlanDefaults {
            repository_root: self.repository_root(),
            installation_root: self.installation_root(),
            artifact_root,
        }
    }
}
