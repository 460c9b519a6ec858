//! Settings parser for loading the orchestrator configuration.
//!
//! This module handles loading settings from YAML files, `.env` files, and
//! `APPLIANCE_DEPLOY_*` environment variables, in that order of precedence.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::settings::DeployConfig;

/// Prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "APPLIANCE_DEPLOY_";

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["appliance-deploy.yaml", "appliance-deploy.yml"];

/// Settings parser.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving the `.env` file.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory the `.env` file is loaded from.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<DeployConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            message: format!("Failed to read file: {e}"),
            location: Some(path.display().to_string()),
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses settings from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<DeployConfig> {
        debug!("Parsing YAML configuration");

        // An empty file is a valid, all-defaults configuration.
        if content.trim().is_empty() {
            return Ok(DeployConfig::default());
        }

        let config: DeployConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            }
        })?;

        Ok(config)
    }

    /// Loads settings and applies overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an override
    /// has an invalid value.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<DeployConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Applies `APPLIANCE_DEPLOY_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if `APPLIANCE_DEPLOY_POLL_INTERVAL_MS` is not a number.
    pub fn apply_env_overrides<F>(config: &mut DeployConfig, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            let name = format!("{ENV_PREFIX}{key}");
            let value = lookup(&name);
            if value.is_some() {
                debug!("Overriding setting from {name}");
            }
            value
        };

        if let Some(mission) = var("MISSION") {
            config.mission = Some(mission);
        }
        if let Some(path) = var("SOURCE_PATH") {
            config.source.path = Some(path);
        }
        if let Some(bucket) = var("SOURCE_BUCKET") {
            config.source.bucket = Some(bucket);
        }
        if let Some(key) = var("SOURCE_KEY") {
            config.source.key = Some(key);
        }
        if let Some(url) = var("SOURCE_URL") {
            config.source.url = Some(url);
        }
        if let Some(root) = var("REPOSITORY_ROOT") {
            config.repository.root = Some(root);
        }
        if let Some(bucket) = var("REPOSITORY_BUCKET") {
            config.repository.bucket = Some(bucket);
        }
        if let Some(root) = var("INSTALLATION_ROOT") {
            config.installation_root = Some(PathBuf::from(root));
        }
        if let Some(path) = var("STATUS_PATH") {
            config.status.path = Some(PathBuf::from(path));
        }
        if let Some(bucket) = var("STATUS_BUCKET") {
            config.status.bucket = Some(bucket);
        }
        if let Some(interval) = var("POLL_INTERVAL_MS") {
            config.poll.interval_ms = interval.trim().parse().map_err(|e| ConfigError::ParseError {
                message: format!("Invalid poll interval '{interval}': {e}"),
                location: Some(format!("{ENV_PREFIX}POLL_INTERVAL_MS")),
            })?;
        }

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| ConfigError::ParseError {
                message: format!("Failed to load .env file: {e}"),
                location: Some(env_path.display().to_string()),
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Finds the configuration file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }
    .into())
}
