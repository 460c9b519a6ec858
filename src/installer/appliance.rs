//! Appliance installer.
//!
//! Materializes a loaded deployment unit on local disk: extracts the
//! artifact into the unit's installation directory and writes its
//! environment and mission configuration next to it.

use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::error::{InstallError, Result};
use crate::plan::{ConfigTree, DeploymentUnit, Plan};

use super::archive::extract_zip;

/// Installs loaded deployment units.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApplianceInstaller;

impl ApplianceInstaller {
    /// Creates a new installer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Deletes and recreates the plan's installation root.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Clean`] if the root is a filesystem root or
    /// cannot be removed or recreated.
    pub async fn clean(&self, plan: &Plan) -> Result<()> {
        let root = &plan.installation_root;

        if root.as_os_str().is_empty() || root.parent().is_none() {
            return Err(InstallError::Clean {
                path: root.clone(),
                message: String::from("refusing to clean a filesystem root"),
            }
            .into());
        }

        let exists = fs::try_exists(root).await.map_err(|e| InstallError::Clean {
            path: root.clone(),
            message: e.to_string(),
        })?;
        if exists {
            debug!("Removing installation root: {}", root.display());
            fs::remove_dir_all(root).await.map_err(|e| InstallError::Clean {
                path: root.clone(),
                message: e.to_string(),
            })?;
        }

        fs::create_dir_all(root).await.map_err(|e| InstallError::Clean {
            path: root.clone(),
            message: e.to_string(),
        })?;

        info!("Installation root ready: {}", root.display());
        Ok(())
    }

    /// Installs one loaded unit.
    ///
    /// Units with `deploy` unset or with an empty buffer are skipped silently.
    /// The buffer is released once extraction finishes, whether or not it
    /// succeeded. `has_installed` is set only when extraction and both
    /// configuration writes succeed.
    ///
    /// # Errors
    ///
    /// Returns an [`InstallError`] naming the unit and the failed path.
    pub async fn install(&self, plan: &Plan, unit: &mut DeploymentUnit) -> Result<()> {
        if !unit.deploy {
            debug!("Skipping install of {}: not marked for deployment", unit.label());
            return Ok(());
        }
        if unit.content_len() == 0 {
            debug!("Skipping install of {}: nothing loaded", unit.label());
            return Ok(());
        }

        unit.has_installed = false;
        let target = unit.installation_location.clone();
        info!(
            "Installing {} into {} (mission {})",
            unit.label(),
            target.display(),
            plan.name
        );

        fs::create_dir_all(&target)
            .await
            .map_err(|e| InstallError::CreateDirectory {
                alias: unit.alias.clone(),
                path: target.clone(),
                message: e.to_string(),
            })?;

        let files = extract_zip(unit.take_content(), &target)
            .await
            .map_err(|e| InstallError::Extract {
                alias: unit.alias.clone(),
                build: unit.build.clone(),
                path: target.clone(),
                message: e.to_string(),
            })?;
        unit.release_content();
        debug!("Extracted {files} file(s) for {}", unit.label());

        Self::write_configurations(unit).await?;

        unit.has_installed = true;
        info!("Installed {}", unit.label());
        Ok(())
    }

    /// Writes both configuration files. Each is attempted even if the other fails.
    async fn write_configurations(unit: &DeploymentUnit) -> Result<()> {
        let outputs = [
            (&unit.environment_configuration, &unit.environment_config_location),
            (&unit.mission_configuration, &unit.mission_config_location),
        ];

        let mut failures = Vec::new();
        for (tree, path) in outputs {
            if let Err(message) = write_config(tree, path).await {
                error!("Failed to write {} for {}: {message}", path.display(), unit.label());
                failures.push(format!("{}: {message}", path.display()));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(InstallError::WriteConfig {
                alias: unit.alias.clone(),
                message: failures.join("; "),
            }
            .into())
        }
    }
}

/// Serializes a configuration tree as pretty JSON, writing through a
/// temporary file and renaming it into place.
async fn write_config(tree: &ConfigTree, path: &Path) -> std::result::Result<(), String> {
    let content = serde_json::to_string_pretty(tree).map_err(|e| format!("serialize: {e}"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("create directory: {e}"))?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)
        .await
        .map_err(|e| format!("create: {e}"))?;
    file.write_all(content.as_bytes())
        .await
        .map_err(|e| format!("write: {e}"))?;
    file.sync_all().await.map_err(|e| format!("sync: {e}"))?;
    fs::rename(&temp_path, path)
        .await
        .map_err(|e| format!("rename: {e}"))?;

    Ok(())
}
