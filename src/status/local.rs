//! Local file-based status backend.
//!
//! Writes the status document to a JSON file on the appliance host, where
//! health checks can poll it.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{Result, StatusError};

use super::types::PlanStatus;
use super::writer::PlanWriter;

/// Status file name.
pub const STATUS_FILE: &str = "status.json";

/// Local file-based status writer.
#[derive(Debug)]
pub struct LocalStatusWriter {
    /// Path to the status file.
    status_path: PathBuf,
}

impl LocalStatusWriter {
    /// Creates a writer that stores `status.json` in the given directory.
    #[must_use]
    pub fn with_base_dir(base_dir: impl AsRef<Path>) -> Self {
        Self {
            status_path: base_dir.as_ref().join(STATUS_FILE),
        }
    }

    /// Creates a writer for an explicit status file path.
    #[must_use]
    pub fn with_status_path(status_path: impl Into<PathBuf>) -> Self {
        Self {
            status_path: status_path.into(),
        }
    }

    /// Returns the status file path.
    #[must_use]
    pub fn status_path(&self) -> &Path {
        &self.status_path
    }

    fn write_error(&self, action: &str, e: &std::io::Error) -> StatusError {
        StatusError::Write {
            location: self.status_path.display().to_string(),
            message: format!("Failed to {action}: {e}"),
        }
    }
}

#[async_trait]
impl PlanWriter for LocalStatusWriter {
    async fn save(&self, status: &PlanStatus) -> Result<()> {
        if let Some(parent) = self.status_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error("create status directory", &e))?;
        }

        info!("Writing status to: {}", self.status_path.display());

        let content = serde_json::to_string_pretty(status).map_err(|e| {
            StatusError::serialization(format!("Failed to serialize status: {e}"))
        })?;

        // Write to a temporary file first, then rename for atomicity
        let temp_path = self.status_path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| self.write_error("create temp status file", &e))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| self.write_error("write status file", &e))?;

        file.sync_all()
            .await
            .map_err(|e| self.write_error("sync status file", &e))?;

        fs::rename(&temp_path, &self.status_path)
            .await
            .map_err(|e| self.write_error("rename status file", &e))?;

        debug!("Status written successfully");
        Ok(())
    }

    async fn load(&self) -> Result<Option<PlanStatus>> {
        let exists = fs::try_exists(&self.status_path).await.map_err(|e| {
            StatusError::Corrupted {
                message: format!("Failed to check status file: {e}"),
            }
        })?;
        if !exists {
            debug!("Status file does not exist: {}", self.status_path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&self.status_path).await.map_err(|e| {
            StatusError::Corrupted {
                message: format!("Failed to read status file: {e}"),
            }
        })?;

        let status: PlanStatus = serde_json::from_str(&content).map_err(|e| {
            StatusError::Corrupted {
                message: format!("Failed to parse status file: {e}"),
            }
        })?;

        Ok(Some(status))
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}
