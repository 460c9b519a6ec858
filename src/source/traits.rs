//! Plan source trait definition.
//!
//! A plan source watches one remote plan document. It keeps the version
//! token of the last document it handed out and only downloads the document
//! again when the remote token changes.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

use crate::error::{Result, SourceError};

/// Placeholder substituted with the mission name in source locations.
pub const MISSION_PLACEHOLDER: &str = "{mission}";

/// Trait for plan document stores.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanSource: Send + Sync {
    /// Performs one-time initialization, such as resolving the mission name.
    ///
    /// Calling it again after success is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::StartFailed`] if initialization fails.
    async fn start(&mut self) -> Result<()>;

    /// Compares the cached version token against the remote store and
    /// downloads the document when it changed.
    ///
    /// Returns `true` when a new document is now available from [`Self::source`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unreachable`] when the store cannot be reached,
    /// or [`SourceError::NotStarted`] before a successful `start`.
    async fn check_for_update(&mut self) -> Result<bool>;

    /// Returns the raw document cached by the last detected update.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NoContent`] if no update has been detected yet.
    fn source(&self) -> Result<Bytes>;

    /// Clears the cached version token so the next check reports an update.
    fn reload(&mut self);

    /// Describes where the plan document lives.
    fn location(&self) -> String;

    /// Gets the backend type name.
    fn source_type(&self) -> &'static str;
}

/// Asks a source whether a newer plan exists.
///
/// An unreachable store is logged and reported as "no update" so the next
/// poll simply tries again. Every other error propagates.
///
/// # Errors
///
/// Returns any non-transient error from [`PlanSource::check_for_update`].
pub async fn has_updated_plan(source: &mut dyn PlanSource) -> Result<bool> {
    match source.check_for_update().await {
        Ok(updated) => Ok(updated),
        Err(e) if e.is_transient() => {
            warn!("Plan source check failed, will retry next poll: {e}");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Resolves the mission name, falling back to the host name.
///
/// # Errors
///
/// Returns [`SourceError::StartFailed`] if no mission is configured and the
/// host name cannot be read.
pub fn resolve_mission(mission: Option<&str>) -> Result<String> {
    if let Some(name) = mission.map(str::trim).filter(|m| !m.is_empty()) {
        return Ok(name.to_string());
    }

    let host = hostname::get().map_err(|e| SourceError::StartFailed {
        message: format!("Failed to read host name: {e}"),
    })?;
    let host = host.to_string_lossy().trim().to_string();

    if host.is_empty() {
        return Err(SourceError::StartFailed {
            message: String::from("Host name is empty and no mission is configured"),
        }
        .into());
    }
    Ok(host)
}

/// Substitutes the mission name into a location template.
///
/// Templates without the placeholder are returned unchanged and never
/// trigger host name resolution.
///
/// # Errors
///
/// Returns [`SourceError::StartFailed`] if the mission must be resolved and cannot be.
pub fn resolve_location(template: &str, mission: Option<&str>) -> Result<String> {
    if !template.contains(MISSION_PLACEHOLDER) {
        return Ok(template.to_string());
    }
    let mission = resolve_mission(mission)?;
    Ok(template.replace(MISSION_PLACEHOLDER, &mission))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployError;

    #[test]
    fn test_resolve_location_substitutes_mission() {
        let resolved = resolve_location("plans/{mission}.yaml", Some("alpha")).expect("resolve");
        assert_eq!(resolved, "plans/alpha.yaml");
    }

    #[test]
    fn test_resolve_location_without_placeholder() {
        let resolved = resolve_location("/etc/plan.yaml", None).expect("resolve");
        assert_eq!(resolved, "/etc/plan.yaml");
    }

    #[test]
    fn test_blank_mission_falls_back_to_host() {
        let resolved = resolve_mission(Some("  ")).expect("host name");
        assert!(!resolved.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_is_no_update() {
        let mut source = MockPlanSource::new();
        source
            .expect_check_for_update()
            .times(1)
            .returning(|| Err(SourceError::unreachable("s3://plans/alpha", "timeout").into()));

        let updated = tokio_test::assert_ok!(has_updated_plan(&mut source).await);
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_not_started_propagates() {
        let mut source = MockPlanSource::new();
        source
            .expect_check_for_update()
            .times(1)
            .returning(|| Err(SourceError::NotStarted.into()));

        let result = has_updated_plan(&mut source).await;
        assert!(matches!(
            result,
            Err(DeployError::Source(SourceError::NotStarted))
        ));
    }
}
