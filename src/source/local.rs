//! Local file plan source.
//!
//! The version token is the file's length and modification time, so the
//! document is only read when one of them changes.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, SourceError};

use super::traits::{resolve_location, PlanSource};

/// Plan source backed by a file on local disk.
#[derive(Debug, Clone)]
pub struct LocalPlanSource {
    template: String,
    mission: Option<String>,
    path: Option<PathBuf>,
    token: Option<String>,
    content: Option<Bytes>,
}

impl LocalPlanSource {
    /// Creates a source for a path template, which may contain `{mission}`.
    #[must_use]
    pub fn new(template: impl Into<String>, mission: Option<String>) -> Self {
        Self {
            template: template.into(),
            mission,
            path: None,
            token: None,
            content: None,
        }
    }

    /// Returns the resolved path, once started.
    #[must_use]
    pub const fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    async fn version_token(path: &PathBuf) -> Result<String> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| SourceError::unreachable(path.display().to_string(), e.to_string()))?;

        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_nanos());

        Ok(format!("{}-{modified}", metadata.len()))
    }
}

#[async_trait]
impl PlanSource for LocalPlanSource {
    async fn start(&mut self) -> Result<()> {
        if self.path.is_some() {
            return Ok(());
        }
        let resolved = resolve_location(&self.template, self.mission.as_deref())?;
        info!("Watching plan file {resolved}");
        self.path = Some(PathBuf::from(resolved));
        Ok(())
    }

    async fn check_for_update(&mut self) -> Result<bool> {
        let path = self.path.clone().ok_or(SourceError::NotStarted)?;
        let token = Self::version_token(&path).await?;

        if self.token.as_deref() == Some(token.as_str()) {
            return Ok(false);
        }

        let data = fs::read(&path)
            .await
            .map_err(|e| SourceError::unreachable(path.display().to_string(), e.to_string()))?;

        debug!("Plan file changed ({} bytes, token {token})", data.len());
        self.content = Some(Bytes::from(data));
        self.token = Some(token);
        Ok(true)
    }

    fn source(&self) -> Result<Bytes> {
        self.content.clone().ok_or_else(|| {
            SourceError::NoContent {
                location: self.location(),
            }
            .into()
        })
    }

    fn reload(&mut self) {
        debug!("Clearing cached plan token for {}", self.location());
        self.token = None;
    }

    fn location(&self) -> String {
        self.path
            .as_ref()
            .map_or_else(|| self.template.clone(), |p| p.display().to_string())
    }

    fn source_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployError;
    use tempfile::TempDir;

    async fn started(path: &std::path::Path) -> LocalPlanSource {
        let mut source = LocalPlanSource::new(path.display().to_string(), None);
        source.start().await.expect("start");
        source
    }

    #[tokio::test]
    async fn test_first_check_reports_update() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("plan.yaml");
        std::fs::write(&path, "mission: alpha\n").expect("write");
        let mut source = started(&path).await;

        assert!(source.check_for_update().await.expect("check"));
        assert_eq!(source.source().expect("content").as_ref(), b"mission: alpha\n");
        assert!(!source.check_for_update().await.expect("check"));
    }

    #[tokio::test]
    async fn test_change_detected() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("plan.yaml");
        std::fs::write(&path, "mission: alpha\n").expect("write");
        let mut source = started(&path).await;
        assert!(source.check_for_update().await.expect("check"));

        std::fs::write(&path, "mission: alpha\ndeployments: []\n").expect("write");

        assert!(source.check_for_update().await.expect("check"));
        assert_eq!(
            source.source().expect("content").as_ref(),
            b"mission: alpha\ndeployments: []\n"
        );
    }

    #[tokio::test]
    async fn test_reload_forces_update() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("plan.yaml");
        std::fs::write(&path, "mission: alpha\n").expect("write");
        let mut source = started(&path).await;
        assert!(source.check_for_update().await.expect("check"));

        source.reload();

        assert!(source.check_for_update().await.expect("check"));
    }

    #[tokio::test]
    async fn test_source_before_update_is_error() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let source = started(&temp.path().join("plan.yaml")).await;

        assert!(matches!(
            source.source(),
            Err(DeployError::Source(SourceError::NoContent { .. }))
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_transient() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let mut source = started(&temp.path().join("absent.yaml")).await;

        let err = source.check_for_update().await.expect_err("missing file");
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_check_before_start_fails() {
        let mut source = LocalPlanSource::new("/etc/plan.yaml", None);
        assert!(matches!(
            source.check_for_update().await,
            Err(DeployError::Source(SourceError::NotStarted))
        ));
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let template = format!("{}/{{mission}}.yaml", temp.path().display());
        let mut source = LocalPlanSource::new(template, Some(String::from("alpha")));

        source.start().await.expect("start");
        source.start().await.expect("start again");

        assert_eq!(source.path(), Some(&temp.path().join("alpha.yaml")));
    }
}
