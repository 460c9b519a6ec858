//! Appliance loader.
//!
//! The loader cleans stale repository versions, fetches artifact bytes for a
//! deployment unit through an [`ArtifactFetcher`], verifies them against the
//! unit checksum, and keeps a verified copy in the current version directory.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{LoadError, Result};
use crate::plan::{DeploymentUnit, Plan};

use super::checksum::{self, ChecksumOutcome};
use super::fetcher::ArtifactFetcher;

/// Extension of cached artifact copies.
const CACHE_EXTENSION: &str = "zip";

/// Loads deployment unit artifacts into memory.
pub struct ApplianceLoader {
    fetcher: Box<dyn ArtifactFetcher>,
}

impl std::fmt::Debug for ApplianceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplianceLoader")
            .field("backend", &self.fetcher.backend_type())
            .finish()
    }
}

impl ApplianceLoader {
    /// Creates a loader backed by the given fetcher.
    #[must_use]
    pub fn new(fetcher: Box<dyn ArtifactFetcher>) -> Self {
        Self { fetcher }
    }

    /// Removes cached artifacts of every repository version except the
    /// plan's current one, and makes sure the repository root exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository root cannot be created or a stale
    /// version directory cannot be removed.
    pub async fn clean(&self, plan: &Plan) -> Result<()> {
        let root = &plan.repository_root;
        fs::create_dir_all(root).await.map_err(|e| cache_error(root, &e))?;

        let mut entries = fs::read_dir(root).await.map_err(|e| cache_error(root, &e))?;
        let mut removed = 0usize;

        while let Some(entry) = entries.next_entry().await.map_err(|e| cache_error(root, &e))? {
            let path = entry.path();
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| cache_error(&path, &e))?
                .is_dir();

            if !is_dir || entry.file_name() == plan.repository_version.as_str() {
                continue;
            }

            debug!("Removing stale repository version: {}", path.display());
            fs::remove_dir_all(&path)
                .await
                .map_err(|e| cache_error(&path, &e))?;
            removed += 1;
        }

        if removed > 0 {
            info!("Removed {removed} stale repository version(s) from {}", root.display());
        }
        Ok(())
    }

    /// Fetches and verifies the artifact of one unit.
    ///
    /// Units with `deploy` unset are skipped without any I/O. On success the
    /// unit buffer holds the verified bytes, rewound, and `has_loaded` is set.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Fetch`] when the backend fails,
    /// [`LoadError::ChecksumMismatch`] or [`LoadError::InvalidChecksum`] when
    /// verification fails, or [`LoadError::Cache`] when the verified copy
    /// cannot be written. The buffer is emptied on every failure.
    pub async fn load(&self, plan: &Plan, unit: &mut DeploymentUnit) -> Result<()> {
        if !unit.deploy {
            debug!("Skipping load of {}: not marked for deployment", unit.label());
            return Ok(());
        }

        unit.has_loaded = false;
        let location = self
            .fetcher
            .location(&plan.artifact_root, &unit.repository_location);
        info!("Loading {} from {location}", unit.label());

        let bytes = self
            .fetcher
            .fetch(&plan.artifact_root, &unit.repository_location)
            .await
            .map_err(|message| LoadError::Fetch {
                alias: unit.alias.clone(),
                build: unit.build.clone(),
                location: location.clone(),
                message,
            })?;

        unit.set_content(bytes.to_vec());

        if unit.has_checksum() {
            Self::verify(unit)?;
        } else {
            warn!("No checksum configured for {}; skipping verification", unit.label());
        }

        if let Err(e) = Self::cache(plan, unit).await {
            unit.release_content();
            return Err(e);
        }

        unit.has_loaded = true;
        debug!("Loaded {} ({} bytes)", unit.label(), unit.content_len());
        Ok(())
    }

    fn verify(unit: &mut DeploymentUnit) -> Result<()> {
        match checksum::verify(unit.repository_content.get_ref(), &unit.checksum) {
            Ok(ChecksumOutcome::Match) => {
                debug!("Checksum verified for {}", unit.label());
                Ok(())
            }
            Ok(ChecksumOutcome::Mismatch(actual)) => {
                unit.release_content();
                Err(LoadError::ChecksumMismatch {
                    alias: unit.alias.clone(),
                    build: unit.build.clone(),
                    expected: unit.checksum.clone(),
                    actual,
                }
                .into())
            }
            Err(message) => {
                unit.release_content();
                Err(LoadError::InvalidChecksum {
                    alias: unit.alias.clone(),
                    checksum: unit.checksum.clone(),
                    message,
                }
                .into())
            }
        }
    }

    async fn cache(plan: &Plan, unit: &DeploymentUnit) -> Result<()> {
        if plan.repository_version.is_empty() {
            return Ok(());
        }

        let path = cached_artifact_path(plan, unit);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| cache_error(parent, &e))?;
        }
        fs::write(&path, unit.repository_content.get_ref())
            .await
            .map_err(|e| cache_error(&path, &e))?;
        Ok(())
    }
}

/// Path of the verified artifact copy for a unit in the current repository version.
#[must_use]
pub fn cached_artifact_path(plan: &Plan, unit: &DeploymentUnit) -> PathBuf {
    plan.repository_version_dir()
        .join(format!("{}.{CACHE_EXTENSION}", unit.alias))
}

fn cache_error(path: &Path, e: &std::io::Error) -> LoadError {
    LoadError::Cache {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}
