//! Configuration module for the deployment orchestrator.
//!
//! This module handles the orchestrator's own settings:
//! - Parsing `appliance-deploy.yaml`
//! - `.env` loading and `APPLIANCE_DEPLOY_*` overrides
//! - Field and cross-field validation

mod parser;
mod settings;
mod rules;

pub use parser::{find_config_file, ConfigParser, DEFAULT_CONFIG_FILES, ENV_PREFIX};
pub use settings::{
    DeployConfig, PollConfig, RepositoryConfig, SourceBackend, SourceConfig, StatusConfig,
    StoreBackend, DEFAULT_POLL_INTERVAL_MS,
};
pub use rules::{ConfigValidator, ValidationError, ValidationResult};
