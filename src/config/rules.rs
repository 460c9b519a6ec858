//! Settings validation rules.
//!
//! Field rules come from the `validator` derive on the settings types.
//! Rules that span several fields (a backend and the location it needs)
//! are checked here.

use tracing::{debug, warn};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::{ConfigError, Result};

use super::settings::{DeployConfig, SourceBackend, StoreBackend};

/// Poll intervals below this many milliseconds are legal but produce a warning.
const LOW_INTERVAL_WARN_MS: u64 = 10;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

/// Validator for orchestrator settings.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates orchestrator settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first invalid field.
    pub fn validate(&self, config: &DeployConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        if let Err(errors) = config.validate() {
            collect_field_errors("", &errors, &mut result);
        }
        Self::validate_source(config, &mut result);
        Self::validate_repository(config, &mut result);
        Self::validate_status(config, &mut result);
        Self::validate_poll(config, &mut result);

        for warning in &result.warnings {
            warn!("{warning}");
        }

        match result.errors.first() {
            None => {
                debug!("Configuration validation passed");
                Ok(result)
            }
            Some(first) => Err(ConfigError::validation(first.message.clone(), first.field.clone()).into()),
        }
    }

    fn validate_source(config: &DeployConfig, result: &mut ValidationResult) {
        let source = &config.source;
        match source.backend {
            SourceBackend::Local => {
                require(source.path.as_deref(), "source.path", "Local plan source requires a path", result);
            }
            SourceBackend::S3 => {
                require(source.bucket.as_deref(), "source.bucket", "S3 plan source requires a bucket", result);
                require(source.key.as_deref(), "source.key", "S3 plan source requires a key", result);
            }
            SourceBackend::Http => {
                require(source.url.as_deref(), "source.url", "HTTP plan source requires a url", result);
                if let Some(url) = source.url.as_deref() {
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        result.errors.push(ValidationError {
                            field: String::from("source.url"),
                            message: format!("Plan source url '{url}' must use http or https"),
                        });
                    }
                }
            }
        }
    }

    fn validate_repository(config: &DeployConfig, result: &mut ValidationResult) {
        let repository = &config.repository;
        match repository.backend {
            StoreBackend::Local => {
                if repository.root.is_none() {
                    result.warnings.push(String::from(
                        "repository.root is not set; artifact keys resolve against the working directory",
                    ));
                }
            }
            StoreBackend::S3 => {
                require(
                    repository.bucket.as_deref(),
                    "repository.bucket",
                    "S3 artifact repository requires a bucket",
                    result,
                );
            }
        }
    }

    fn validate_status(config: &DeployConfig, result: &mut ValidationResult) {
        if config.status.backend == StoreBackend::S3 {
            require(
                config.status.bucket.as_deref(),
                "status.bucket",
                "S3 status backend requires a bucket",
                result,
            );
        }
    }

    fn validate_poll(config: &DeployConfig, result: &mut ValidationResult) {
        let interval = config.poll.interval_ms;
        if interval > 0 && interval < LOW_INTERVAL_WARN_MS {
            result.warnings.push(format!(
                "poll.interval_ms is {interval}; very short intervals keep the plan source busy"
            ));
        }
    }
}

fn require(value: Option<&str>, field: &str, message: &str, result: &mut ValidationResult) {
    if value.is_none_or(|v| v.trim().is_empty()) {
        result.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }
}

/// Flattens derive errors into dotted field paths.
fn collect_field_errors(prefix: &str, errors: &ValidationErrors, result: &mut ValidationResult) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map_or_else(|| format!("{path} failed rule '{}'", error.code), ToString::to_string);
                    result.errors.push(ValidationError {
                        field: path.clone(),
                        message,
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_field_errors(&path, nested, result),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_field_errors(&format!("{path}[{index}]"), nested, result);
                }
            }
        }
    }
}
