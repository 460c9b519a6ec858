//! Plan construction and repository-version bookkeeping.
//!
//! The factory turns raw plan document bytes into a [`Plan`], fills in
//! defaults from the orchestrator settings, assigns a content-addressed
//! repository version, and hands finished plans to a [`PlanWriter`].

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{PlanError, Result};
use crate::repository::sha256_hex;
use crate::status::{PlanStatus, PlanWriter};

use super::document::{PlanDocument, UnitDocument};
use super::model::{DeploymentUnit, Plan, ENVIRONMENT_CONFIG_FILE, MISSION_CONFIG_FILE};

/// Number of digest characters used in a repository version tag.
const VERSION_DIGEST_CHARS: usize = 16;

/// Defaults applied when the plan document leaves a root unspecified.
#[derive(Debug, Clone)]
pub struct PlanDefaults {
    /// Default local repository cache root.
    pub repository_root: PathBuf,
    /// Default installation root.
    pub installation_root: PathBuf,
    /// Default artifact backend root.
    pub artifact_root: String,
}

/// Builds [`Plan`]s from plan documents.
#[derive(Debug, Clone)]
pub struct PlanFactory {
    defaults: PlanDefaults,
}

impl PlanFactory {
    /// Creates a factory with the given defaults.
    #[must_use]
    pub const fn new(defaults: PlanDefaults) -> Self {
        Self { defaults }
    }

    /// Parses a plan document and builds a fresh plan.
    ///
    /// When `compute_repository_version` is set, a repository version is
    /// assigned and its directory prepared; otherwise the plan is built
    /// without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Parse`] or [`PlanError::Invalid`] for a bad
    /// document, or an error preparing the repository version directory.
    pub async fn create(&self, source: &[u8], compute_repository_version: bool) -> Result<Plan> {
        let mut plan = self.parse(source)?;

        if compute_repository_version {
            self.create_repository_version(&mut plan).await?;
        }

        Ok(plan)
    }

    /// Parses and validates a plan document without side effects.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or invalid.
    pub fn parse(&self, source: &[u8]) -> Result<Plan> {
        let text = std::str::from_utf8(source).map_err(|e| PlanError::Parse {
            message: format!("Plan document is not valid UTF-8: {e}"),
            location: None,
        })?;

        let document: PlanDocument = serde_yaml::from_str(text).map_err(|e| PlanError::Parse {
            message: format!("Plan document parse error: {e}"),
            location: e.location().map(|l| format!("line {}, column {}", l.line(), l.column())),
        })?;

        document.validate()?;

        let plan = self.build(document, sha256_hex(source));
        debug!(
            "Parsed plan for mission {} with {} deployment units",
            plan.name,
            plan.deployments.len()
        );
        Ok(plan)
    }

    /// Derives the repository version from the plan content and prepares an
    /// empty directory for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be reset.
    pub async fn create_repository_version(&self, plan: &mut Plan) -> Result<()> {
        plan.repository_version = repository_version_for(&plan.content_digest);
        let dir = plan.repository_version_dir();

        let exists = fs::try_exists(&dir)
            .await
            .map_err(|e| version_error(&dir, &e))?;
        if exists {
            debug!("Resetting repository version directory: {}", dir.display());
            fs::remove_dir_all(&dir)
                .await
                .map_err(|e| version_error(&dir, &e))?;
        }

        fs::create_dir_all(&dir)
            .await
            .map_err(|e| version_error(&dir, &e))?;

        info!(
            "Assigned repository version {} for mission {}",
            plan.repository_version, plan.name
        );
        Ok(())
    }

    /// Publishes the plan's resulting state through a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub async fn save(&self, plan: &Plan, writer: &dyn PlanWriter) -> Result<PlanStatus> {
        let status = PlanStatus::from_plan(plan);
        writer.save(&status).await?;
        Ok(status)
    }

    fn build(&self, document: PlanDocument, content_digest: String) -> Plan {
        let installation_root = document
            .installation_root
            .unwrap_or_else(|| self.defaults.installation_root.clone());
        let repository_root = document
            .repository_root
            .unwrap_or_else(|| self.defaults.repository_root.clone());
        let artifact_root = document
            .artifact_root
            .unwrap_or_else(|| self.defaults.artifact_root.clone());

        let deployments = document
            .deployments
            .into_iter()
            .map(|unit| build_unit(unit, &installation_root))
            .collect();

        Plan {
            name: document.mission,
            repository_root,
            repository_version: String::new(),
            installation_root,
            artifact_root,
            content_digest,
            deployments,
        }
    }
}

fn build_unit(doc: UnitDocument, installation_root: &Path) -> DeploymentUnit {
    let installation_location = doc
        .installation_location
        .unwrap_or_else(|| installation_root.join(&doc.alias));
    let environment_config_location = doc
        .environment_config_location
        .unwrap_or_else(|| installation_location.join(ENVIRONMENT_CONFIG_FILE));
    let mission_config_location = doc
        .mission_config_location
        .unwrap_or_else(|| installation_location.join(MISSION_CONFIG_FILE));

    DeploymentUnit {
        name: doc.name.unwrap_or_else(|| doc.alias.clone()),
        alias: doc.alias,
        build: doc.build,
        repository_location: doc.key,
        checksum: doc.checksum.trim().to_string(),
        deploy: doc.deploy,
        environment_configuration: doc.environment_configuration,
        mission_configuration: doc.mission_configuration,
        installation_location,
        environment_config_location,
        mission_config_location,
        ..DeploymentUnit::default()
    }
}

/// Returns the repository version tag for a plan content digest.
#[must_use]
pub fn repository_version_for(content_digest: &str) -> String {
    let token: String = content_digest.chars().take(VERSION_DIGEST_CHARS).collect();
    format!("v{token}")
}

fn version_error(dir: &Path, e: &std::io::Error) -> PlanError {
    PlanError::RepositoryVersion {
        path: dir.to_path_buf(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployError;
    use crate::plan::ConfigValue;
    use tempfile::TempDir;

    const PLAN: &str = r"
mission: alpha
artifact_root: releases
deployments:
  - alias: web
    build: '1.4.2'
    key: web/web-1.4.2.zip
    checksum: ' ABCDEF '
    environment_configuration:
      port: 8080
      tls: { enabled: true }
  - alias: worker
    build: '2.0'
    key: worker.zip
    deploy: false
";

    fn factory(temp: &TempDir) -> PlanFactory {
        PlanFactory::new(PlanDefaults {
            repository_root: temp.path().join("repository"),
            installation_root: temp.path().join("install"),
            artifact_root: String::from("default-root"),
        })
    }

    #[test]
    fn test_parse_applies_defaults() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let plan = factory(&temp).parse(PLAN.as_bytes()).expect("plan should parse");

        assert_eq!(plan.name, "alpha");
        assert_eq!(plan.installation_root, temp.path().join("install"));
        assert_eq!(plan.repository_root, temp.path().join("repository"));
        assert_eq!(plan.artifact_root, "releases");
        assert!(plan.repository_version.is_empty());
        assert_eq!(plan.deployments.len(), 2);

        let web = plan.unit("web").expect("web unit");
        assert_eq!(web.checksum, "ABCDEF");
        assert_eq!(web.installation_location, temp.path().join("install").join("web"));
        assert_eq!(
            web.environment_configuration.get("port"),
            Some(&ConfigValue::Integer(8080))
        );

        let worker = plan.unit("worker").expect("worker unit");
        assert!(!worker.deploy);
    }

    #[test]
    fn test_units_keep_declared_order() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let plan = factory(&temp).parse(PLAN.as_bytes()).expect("plan should parse");
        let aliases: Vec<_> = plan.deployments.iter().map(|u| u.alias.as_str()).collect();
        assert_eq!(aliases, vec!["web", "worker"]);
    }

    #[test]
    fn test_json_document_accepted() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let json = r#"{"mission":"beta","deployments":[]}"#;
        let plan = factory(&temp).parse(json.as_bytes()).expect("json plan should parse");
        assert_eq!(plan.name, "beta");
        assert!(plan.deployments.is_empty());
        assert_eq!(plan.artifact_root, "default-root");
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let result = factory(&temp).parse(b"mission: [unclosed");
        assert!(matches!(result, Err(DeployError::Plan(PlanError::Parse { .. }))));
    }

    #[test]
    fn test_infinite_configuration_is_invalid() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let document = PLAN.replace("port: 8080", "port: 8080\n      limit: .inf");

        let result = factory(&temp).parse(document.as_bytes());

        assert!(matches!(
            result,
            Err(DeployError::Plan(PlanError::Invalid { ref field, .. }))
                if field == "deployments[0].environment_configuration.limit"
        ));
    }

    #[tokio::test]
    async fn test_unreadable_repository_root_is_reported() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"file").expect("write");
        let factory = PlanFactory::new(PlanDefaults {
            repository_root: blocker.join("repository"),
            installation_root: temp.path().join("install"),
            artifact_root: String::new(),
        });

        let result = factory.create(PLAN.as_bytes(), true).await;

        assert!(matches!(
            result,
            Err(DeployError::Plan(PlanError::RepositoryVersion { .. }))
        ));
    }

    #[tokio::test]
    async fn test_repository_version_is_content_addressed() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let factory = factory(&temp);

        let first = factory.create(PLAN.as_bytes(), true).await.expect("create");
        let again = factory.create(PLAN.as_bytes(), true).await.expect("create");
        let changed = factory
            .create(PLAN.replace("1.4.2", "1.4.3").as_bytes(), true)
            .await
            .expect("create");

        assert_eq!(first.repository_version, again.repository_version);
        assert_ne!(first.repository_version, changed.repository_version);
        assert_eq!(first.repository_version.len(), VERSION_DIGEST_CHARS + 1);
        assert!(first.repository_version_dir().is_dir());
        assert!(changed.repository_version_dir().is_dir());
    }

    #[tokio::test]
    async fn test_repository_version_dir_is_emptied() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let factory = factory(&temp);

        let plan = factory.create(PLAN.as_bytes(), true).await.expect("create");
        std::fs::write(plan.repository_version_dir().join("stale.zip"), b"old").expect("write");

        let plan = factory.create(PLAN.as_bytes(), true).await.expect("create");
        let entries = std::fs::read_dir(plan.repository_version_dir())
            .expect("read dir")
            .count();
        assert_eq!(entries, 0);
    }

    #[tokio::test]
    async fn test_create_without_version_touches_nothing() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let plan = factory(&temp).create(PLAN.as_bytes(), false).await.expect("create");
        assert!(plan.repository_version.is_empty());
        assert!(!temp.path().join("repository").exists());
    }
}
