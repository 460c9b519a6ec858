//! Error types for the appliance deployment orchestrator.
//!
//! This module provides the error hierarchy for every stage of a
//! reconciliation pass: configuration, plan sources, plan parsing,
//! artifact loading, installation, and status publishing.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the orchestrator.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Orchestrator configuration errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Plan source errors.
    #[error("Plan source error: {0}")]
    Source(#[from] SourceError),

    /// Plan document errors.
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    /// Artifact loading errors.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Installation errors.
    #[error("Install error: {0}")]
    Install(#[from] InstallError),

    /// Status publishing errors.
    #[error("Status error: {0}")]
    Status(#[from] StatusError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Orchestrator configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// Plan source errors.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The remote store could not be reached. Transient.
    #[error("Plan source unreachable at {location}: {message}")]
    Unreachable {
        /// Location of the plan document.
        location: String,
        /// Description of the failure.
        message: String,
    },

    /// No plan content has been fetched yet.
    #[error("No plan content available from {location}; no update has been detected yet")]
    NoContent {
        /// Location of the plan document.
        location: String,
    },

    /// One-time initialization failed.
    #[error("Plan source failed to start: {message}")]
    StartFailed {
        /// Description of the failure.
        message: String,
    },

    /// The source was used before `start` succeeded.
    #[error("Plan source has not been started")]
    NotStarted,
}

/// Plan document errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The plan document could not be parsed.
    #[error("Failed to parse plan document: {message}")]
    Parse {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// The plan document parsed but is not usable.
    #[error("Invalid plan: {field}: {message}")]
    Invalid {
        /// Field path that failed validation.
        field: String,
        /// Description of the problem.
        message: String,
    },

    /// The repository version directory could not be prepared.
    #[error("Failed to prepare repository version directory {path}: {message}")]
    RepositoryVersion {
        /// Directory path.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },
}

/// Artifact loading errors.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Fetching artifact bytes from the backend failed.
    #[error("Failed to fetch appliance '{alias}' build {build} from {location}: {message}")]
    Fetch {
        /// Unit alias.
        alias: String,
        /// Unit build label.
        build: String,
        /// Backend location of the artifact.
        location: String,
        /// Description of the failure.
        message: String,
    },

    /// The fetched bytes do not match the expected checksum.
    #[error("Checksum mismatch for appliance '{alias}' build {build}: expected {expected}, computed {actual}")]
    ChecksumMismatch {
        /// Unit alias.
        alias: String,
        /// Unit build label.
        build: String,
        /// Expected digest.
        expected: String,
        /// Computed digest.
        actual: String,
    },

    /// The configured checksum is not a valid hex digest.
    #[error("Invalid checksum '{checksum}' for appliance '{alias}': {message}")]
    InvalidChecksum {
        /// Unit alias.
        alias: String,
        /// The checksum string from the plan.
        checksum: String,
        /// Description of the problem.
        message: String,
    },

    /// The local artifact cache could not be updated.
    #[error("Artifact cache error at {path}: {message}")]
    Cache {
        /// Cache path.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },
}

/// Installation errors.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The installation directory could not be created.
    #[error("Failed to create installation directory {path} for appliance '{alias}': {message}")]
    CreateDirectory {
        /// Unit alias.
        alias: String,
        /// Directory path.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// The artifact archive could not be extracted.
    #[error("Failed to extract appliance '{alias}' build {build} into {path}: {message}")]
    Extract {
        /// Unit alias.
        alias: String,
        /// Unit build label.
        build: String,
        /// Target directory.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// One or both configuration files could not be written.
    #[error("Failed to write configuration for appliance '{alias}': {message}")]
    WriteConfig {
        /// Unit alias.
        alias: String,
        /// Description of every failed write.
        message: String,
    },

    /// The installation root could not be cleaned.
    #[error("Failed to clean installation root {path}: {message}")]
    Clean {
        /// Installation root.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },
}

/// Status publishing errors.
#[derive(Debug, Error)]
pub enum StatusError {
    /// Writing the status document failed.
    #[error("Failed to write status to {location}: {message}")]
    Write {
        /// Status location.
        location: String,
        /// Description of the failure.
        message: String,
    },

    /// The stored status document is corrupted.
    #[error("Status document is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// S3 backend error.
    #[error("S3 status backend error: {message}")]
    S3Error {
        /// Description of the S3 error.
        message: String,
    },

    /// Serialization error.
    #[error("Status serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },
}

/// Result type alias for orchestrator operations.
pub type Result<T> = std::result::Result<T, DeployError>;

impl DeployError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is transient and expected to clear on the next poll.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Source(SourceError::Unreachable { .. }))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl SourceError {
    /// Creates an unreachable-source error.
    #[must_use]
    pub fn unreachable(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl PlanError {
    /// Creates a validation error for a plan field.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl StatusError {
    /// Creates an S3 error with the given message.
    #[must_use]
    pub fn s3(message: impl Into<String>) -> Self {
        Self::S3Error {
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unreachable_is_transient() {
        let unreachable = DeployError::from(SourceError::unreachable("s3://plans/alpha", "timeout"));
        assert!(unreachable.is_transient());

        let no_content = DeployError::from(SourceError::NoContent {
            location: String::from("/etc/plan.yaml"),
        });
        assert!(!no_content.is_transient());

        let mismatch = DeployError::from(LoadError::ChecksumMismatch {
            alias: String::from("web"),
            build: String::from("1.0"),
            expected: String::from("aa"),
            actual: String::from("bb"),
        });
        assert!(!mismatch.is_transient());
    }

    #[test]
    fn test_messages_carry_unit_context() {
        let err = DeployError::from(LoadError::Fetch {
            alias: String::from("web"),
            build: String::from("1.4.2"),
            location: String::from("releases/web.zip"),
            message: String::from("not found"),
        });
        let text = err.to_string();
        assert!(text.contains("web"));
        assert!(text.contains("1.4.2"));
        assert!(text.contains("releases/web.zip"));
    }
}
