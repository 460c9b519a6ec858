//! Mission orchestrator.
//!
//! The orchestrator is the reconciliation engine. Each call to
//! [`MissionOrchestrator::check_for_updated_plan`] asks the plan source for a
//! newer plan and, when there is one, runs a full pass:
//!
//! 1. Build a fresh [`Plan`] and assign its repository version
//! 2. Clean the repository cache and the installation root
//! 3. Load then install every unit, in plan order, stopping at the first failure
//! 4. Publish the resulting status, including after a failure in step 3
//!
//! There is no internal timer and no internal retry. The caller owns the
//! schedule and must not run two passes at once.

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{DeployConfig, SourceBackend, StoreBackend};
use crate::error::{ConfigError, Result};
use crate::installer::ApplianceInstaller;
use crate::plan::{DeploymentUnit, Plan, PlanFactory};
use crate::repository::{ApplianceLoader, ArtifactFetcher, FsArtifactFetcher, S3ArtifactFetcher};
use crate::source::{has_updated_plan, HttpPlanSource, LocalPlanSource, PlanSource, S3PlanSource};
use crate::status::{LocalStatusWriter, PlanStatus, PlanWriter, S3StatusWriter};

/// Orchestrator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrchestratorState {
    /// Waiting for the next call.
    #[default]
    Idle,
    /// Asking the plan source for an update.
    Checking,
    /// Running a reconciliation pass.
    Reconciling,
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Checking => write!(f, "checking"),
            Self::Reconciling => write!(f, "reconciling"),
        }
    }
}

/// Result of one call to [`MissionOrchestrator::check_for_updated_plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// The plan source reported no update; nothing was touched.
    NoChange,
    /// A pass ran to completion.
    Reconciled(ReconciliationReport),
}

/// Summary of a completed reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Mission name.
    pub mission: String,
    /// Repository version the pass ran against.
    pub repository_version: String,
    /// Identifier of the published status.
    pub pass_id: Uuid,
    /// Total number of units in the plan.
    pub units: usize,
    /// Units marked for deployment.
    pub deployable: usize,
    /// Units fetched and verified.
    pub loaded: usize,
    /// Units installed.
    pub installed: usize,
}

impl ReconciliationReport {
    fn new(plan: &Plan, status: &PlanStatus) -> Self {
        Self {
            mission: plan.name.clone(),
            repository_version: plan.repository_version.clone(),
            pass_id: status.pass_id,
            units: plan.deployments.len(),
            deployable: plan.deployable_count(),
            loaded: plan.loaded_count(),
            installed: plan.installed_count(),
        }
    }

    /// Returns the number of units skipped because they are not marked for deployment.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.units.saturating_sub(self.deployable)
    }
}

impl std::fmt::Display for ReconciliationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Reconciliation of mission {} complete:", self.mission)?;
        writeln!(f, "  Repository version: {}", self.repository_version)?;
        writeln!(f, "  Units: {}", self.units)?;
        writeln!(f, "  Loaded: {}", self.loaded)?;
        writeln!(f, "  Installed: {}", self.installed)?;
        writeln!(f, "  Skipped: {}", self.skipped())?;
        Ok(())
    }
}

/// The reconciliation engine for one mission and one installation root.
pub struct MissionOrchestrator {
    source: Box<dyn PlanSource>,
    factory: PlanFactory,
    loader: ApplianceLoader,
    installer: ApplianceInstaller,
    writer: Box<dyn PlanWriter>,
    state: OrchestratorState,
    last_plan: Option<Plan>,
}

impl std::fmt::Debug for MissionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MissionOrchestrator")
            .field("source", &self.source.source_type())
            .field("loader", &self.loader)
            .field("writer", &self.writer.backend_type())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl MissionOrchestrator {
    /// Creates an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        source: Box<dyn PlanSource>,
        factory: PlanFactory,
        loader: ApplianceLoader,
        installer: ApplianceInstaller,
        writer: Box<dyn PlanWriter>,
    ) -> Self {
        Self {
            source,
            factory,
            loader,
            installer,
            writer,
            state: OrchestratorState::Idle,
            last_plan: None,
        }
    }

    /// Builds an orchestrator with the backends named in the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend cannot be constructed.
    pub async fn from_config(config: &DeployConfig) -> Result<Self> {
        let source = build_source(config).await?;
        let fetcher = build_fetcher(config).await?;
        let writer = build_writer(config).await?;

        Ok(Self::new(
            source,
            PlanFactory::new(config.plan_defaults()),
            ApplianceLoader::new(fetcher),
            ApplianceInstaller::new(),
            writer,
        ))
    }

    /// Initializes the plan source. Safe to call again after a failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot start; the orchestrator must
    /// not be polled until this succeeds.
    pub async fn start(&mut self) -> Result<()> {
        self.source.start().await?;
        info!(
            "Orchestrator started with {} plan source at {}",
            self.source.source_type(),
            self.source.location()
        );
        Ok(())
    }

    /// Runs one reconciliation step.
    ///
    /// Returns [`PassOutcome::NoChange`] without touching the loader,
    /// installer, or writer when the source reports no update. Otherwise runs
    /// a full pass.
    ///
    /// # Errors
    ///
    /// Any failure after the update is detected propagates; the next detected
    /// update (or a [`Self::reload`]) starts over from scratch.
    pub async fn check_for_updated_plan(&mut self) -> Result<PassOutcome> {
        self.state = OrchestratorState::Checking;
        let updated = has_updated_plan(&mut *self.source).await;

        let outcome = match updated {
            Ok(false) => Ok(PassOutcome::NoChange),
            Ok(true) => {
                self.state = OrchestratorState::Reconciling;
                self.reconcile().await.map(PassOutcome::Reconciled)
            }
            Err(e) => Err(e),
        };

        self.state = OrchestratorState::Idle;
        outcome
    }

    /// Forces the next check to report an update.
    pub fn reload(&mut self) {
        self.source.reload();
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Returns the most recent plan built by a pass, including a failed one.
    #[must_use]
    pub const fn last_plan(&self) -> Option<&Plan> {
        self.last_plan.as_ref()
    }

    async fn reconcile(&mut self) -> Result<ReconciliationReport> {
        info!("Plan update detected at {}", self.source.location());
        let document = self.source.source()?;
        let mut plan = self.factory.create(&document, true).await?;

        let result = self.apply(&mut plan).await;
        self.last_plan = Some(plan);

        if let Ok(report) = &result {
            info!("{report}");
        }
        result
    }

    async fn apply(&self, plan: &mut Plan) -> Result<ReconciliationReport> {
        self.loader.clean(plan).await?;

        // From here on the previous installation is gone, so a failure must
        // replace the published status rather than leave the old one standing.
        if let Err(e) = self.install_all(plan).await {
            self.publish_failed(plan).await;
            return Err(e);
        }

        let status = self.factory.save(plan, self.writer.as_ref()).await?;
        Ok(ReconciliationReport::new(plan, &status))
    }

    async fn install_all(&self, plan: &mut Plan) -> Result<()> {
        self.installer.clean(plan).await?;

        let mut units = std::mem::take(&mut plan.deployments);
        let processed = self.process_units(plan, &mut units).await;
        plan.deployments = units;
        processed
    }

    async fn publish_failed(&self, plan: &Plan) {
        match self.factory.save(plan, self.writer.as_ref()).await {
            Ok(_) => warn!(
                "Published degraded status for mission {} ({}/{} deployable units installed)",
                plan.name,
                plan.installed_count(),
                plan.deployable_count()
            ),
            Err(e) => error!("Failed to publish status for mission {}: {e}", plan.name),
        }
    }

    async fn process_units(&self, plan: &Plan, units: &mut [DeploymentUnit]) -> Result<()> {
        for unit in units.iter_mut() {
            debug!("Processing {}", unit.label());
            self.loader.load(plan, unit).await?;
            self.installer.install(plan, unit).await?;
        }
        Ok(())
    }
}

/// Builds the plan source named in the settings.
///
/// # Errors
///
/// Returns an error if a required location is missing or the HTTP client
/// cannot be created.
pub async fn build_source(config: &DeployConfig) -> Result<Box<dyn PlanSource>> {
    let source = &config.source;
    let mission = config.mission.clone();

    let built: Box<dyn PlanSource> = match source.backend {
        SourceBackend::Local => {
            let path = required(source.path.as_deref(), "source.path")?;
            Box::new(LocalPlanSource::new(path, mission))
        }
        SourceBackend::S3 => {
            let bucket = required(source.bucket.as_deref(), "source.bucket")?;
            let key = required(source.key.as_deref(), "source.key")?;
            Box::new(S3PlanSource::new(bucket, key, source.region.as_deref(), mission).await)
        }
        SourceBackend::Http => {
            let url = required(source.url.as_deref(), "source.url")?;
            Box::new(HttpPlanSource::new(url, mission)?)
        }
    };

    Ok(built)
}

/// Builds the artifact fetcher named in the settings.
///
/// # Errors
///
/// Returns an error if an S3 repository has no bucket.
pub async fn build_fetcher(config: &DeployConfig) -> Result<Box<dyn ArtifactFetcher>> {
    let repository = &config.repository;

    let built: Box<dyn ArtifactFetcher> = match repository.backend {
        StoreBackend::Local => Box::new(FsArtifactFetcher::new(
            repository.root.clone().unwrap_or_else(|| String::from(".")),
        )),
        StoreBackend::S3 => {
            let bucket = required(repository.bucket.as_deref(), "repository.bucket")?;
            Box::new(S3ArtifactFetcher::new(bucket, repository.region.as_deref()).await)
        }
    };

    Ok(built)
}

/// Builds the status writer named in the settings.
///
/// # Errors
///
/// Returns an error if an S3 status backend has no bucket.
pub async fn build_writer(config: &DeployConfig) -> Result<Box<dyn PlanWriter>> {
    let status = &config.status;

    let built: Box<dyn PlanWriter> = match status.backend {
        StoreBackend::Local => Box::new(LocalStatusWriter::with_status_path(config.status_path())),
        StoreBackend::S3 => {
            let bucket = required(status.bucket.as_deref(), "status.bucket")?;
            Box::new(
                S3StatusWriter::new(bucket, status.prefix.as_deref(), status.region.as_deref())
                    .await,
            )
        }
    };

    Ok(built)
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::validation(format!("{field} is required for this backend"), field).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DeployError, LoadError, PlanError, SourceError, StatusError};
    use crate::plan::PlanDefaults;
    use crate::repository::{sha256_hex, MockArtifactFetcher};
    use crate::source::MockPlanSource;
    use crate::status::MockPlanWriter;
    use crate::test_support::build_zip;
    use bytes::Bytes;
    use std::path::Path;
    use tempfile::TempDir;

    fn factory(temp: &TempDir) -> PlanFactory {
        PlanFactory::new(PlanDefaults {
            repository_root: temp.path().join("repository"),
            installation_root: temp.path().join("install"),
            artifact_root: String::new(),
        })
    }

    /// A source that reports exactly one update carrying `document`.
    fn source_with(document: String) -> MockPlanSource {
        let mut source = MockPlanSource::new();
        let mut pending = true;
        source.expect_check_for_update().returning(move || {
            let updated = pending;
            pending = false;
            Ok(updated)
        });
        source
            .expect_source()
            .returning(move || Ok(Bytes::from(document.clone())));
        source
            .expect_location()
            .return_const(String::from("mock://plan"));
        source
    }

    fn two_unit_plan(checksum: &str) -> String {
        format!(
            r"
mission: alpha
deployments:
  - alias: web
    build: '1.0'
    key: web.zip
    checksum: '{checksum}'
    environment_configuration:
      port: 8080
    mission_configuration:
      mission: alpha
  - alias: worker
    build: '2.0'
    key: worker.zip
    deploy: false
"
        )
    }

    fn orchestrator(
        temp: &TempDir,
        source: MockPlanSource,
        writer: MockPlanWriter,
    ) -> MissionOrchestrator {
        MissionOrchestrator::new(
            Box::new(source),
            factory(temp),
            ApplianceLoader::new(Box::new(FsArtifactFetcher::new(temp.path().join("artifacts")))),
            ApplianceInstaller::new(),
            Box::new(writer),
        )
    }

    fn publish_artifact(temp: &TempDir, name: &str, data: &[u8]) {
        let dir = temp.path().join("artifacts");
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(dir.join(name), data).expect("write");
    }

    fn is_empty_dir(path: &Path) -> bool {
        std::fs::read_dir(path).map(|mut d| d.next().is_none()).unwrap_or(false)
    }

    #[tokio::test]
    async fn test_no_update_touches_nothing() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let mut source = MockPlanSource::new();
        source.expect_check_for_update().times(2).returning(|| Ok(false));
        source.expect_source().times(0);
        let mut fetcher = MockArtifactFetcher::new();
        fetcher.expect_fetch().times(0);
        let mut writer = MockPlanWriter::new();
        writer.expect_save().times(0);

        let mut orch = MissionOrchestrator::new(
            Box::new(source),
            factory(&temp),
            ApplianceLoader::new(Box::new(fetcher)),
            ApplianceInstaller::new(),
            Box::new(writer),
        );

        assert_eq!(orch.check_for_updated_plan().await.expect("pass"), PassOutcome::NoChange);
        assert_eq!(orch.check_for_updated_plan().await.expect("pass"), PassOutcome::NoChange);
        assert!(orch.last_plan().is_none());
        assert!(!temp.path().join("install").exists());
        assert!(!temp.path().join("repository").exists());
    }

    #[tokio::test]
    async fn test_unreachable_source_is_no_change() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let mut source = MockPlanSource::new();
        source
            .expect_check_for_update()
            .times(1)
            .returning(|| Err(SourceError::unreachable("mock://plan", "timeout").into()));
        let mut writer = MockPlanWriter::new();
        writer.expect_save().times(0);

        let mut orch = orchestrator(&temp, source, writer);

        assert_eq!(orch.check_for_updated_plan().await.expect("pass"), PassOutcome::NoChange);
        assert_eq!(orch.state(), OrchestratorState::Idle);
    }

    #[tokio::test]
    async fn test_installs_deployed_unit_and_skips_disabled() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let zip = build_zip(&[("index.html", "<h1>web</h1>"), ("static/app.js", "run()")]);
        publish_artifact(&temp, "web.zip", &zip);

        let mut writer = MockPlanWriter::new();
        writer
            .expect_save()
            .times(1)
            .withf(|status| {
                status.unit("web").is_some_and(|u| u.has_loaded && u.has_installed)
                    && status.unit("worker").is_some_and(|u| !u.has_loaded && !u.has_installed)
            })
            .returning(|_| Ok(()));

        let mut orch = orchestrator(&temp, source_with(two_unit_plan(&sha256_hex(&zip))), writer);
        let outcome = orch.check_for_updated_plan().await.expect("pass");

        let PassOutcome::Reconciled(report) = outcome else {
            panic!("expected a reconciliation pass");
        };
        assert_eq!(report.units, 2);
        assert_eq!(report.installed, 1);
        assert_eq!(report.skipped(), 1);

        let plan = orch.last_plan().expect("plan");
        let web = plan.unit("web").expect("web");
        let worker = plan.unit("worker").expect("worker");
        assert!(web.has_installed);
        assert_eq!(web.content_len(), 0);
        assert!(!worker.has_installed);

        let web_dir = temp.path().join("install/web");
        assert!(web_dir.join("index.html").is_file());
        assert!(web_dir.join("static/app.js").is_file());
        assert!(web_dir.join("environment.json").is_file());
        assert!(web_dir.join("mission.json").is_file());
        assert!(!temp.path().join("install/worker").exists());
        assert_eq!(orch.state(), OrchestratorState::Idle);

        // The same plan is not reconciled twice.
        assert_eq!(orch.check_for_updated_plan().await.expect("pass"), PassOutcome::NoChange);
    }

    #[tokio::test]
    async fn test_checksum_mismatch_aborts_pass() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let zip = build_zip(&[("index.html", "<h1>web</h1>")]);
        publish_artifact(&temp, "web.zip", b"corrupted in transit");
        publish_artifact(&temp, "api.zip", &zip);

        let document = format!(
            "{}  - alias: api\n    build: '3.0'\n    key: api.zip\n",
            two_unit_plan(&sha256_hex(&zip))
        );
        let mut writer = MockPlanWriter::new();
        writer
            .expect_save()
            .times(1)
            .withf(|status| {
                !status.is_healthy()
                    && status.unit("web").is_some_and(|u| !u.has_loaded && !u.has_installed)
                    && status.unit("api").is_some_and(|u| !u.has_loaded && !u.has_installed)
            })
            .returning(|_| Ok(()));

        let mut orch = orchestrator(&temp, source_with(document), writer);
        let result = orch.check_for_updated_plan().await;

        assert!(matches!(
            result,
            Err(DeployError::Load(LoadError::ChecksumMismatch { .. }))
        ));
        assert_eq!(orch.state(), OrchestratorState::Idle);

        let plan = orch.last_plan().expect("failed plan is kept");
        let web = plan.unit("web").expect("web");
        assert!(!web.has_loaded);
        assert_eq!(web.content_len(), 0);
        assert!(!temp.path().join("install/web").exists());

        // Units after the failing one are untouched.
        let api = plan.unit("api").expect("api");
        assert!(!api.has_loaded);
        assert!(!temp.path().join("install/api").exists());
    }

    #[tokio::test]
    async fn test_status_failure_keeps_original_error() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        publish_artifact(&temp, "web.zip", b"corrupted in transit");

        let mut writer = MockPlanWriter::new();
        writer
            .expect_save()
            .times(1)
            .returning(|_| Err(StatusError::s3("bucket unavailable").into()));

        let mut orch = orchestrator(
            &temp,
            source_with(two_unit_plan(&sha256_hex(b"expected"))),
            writer,
        );
        let result = orch.check_for_updated_plan().await;

        assert!(matches!(
            result,
            Err(DeployError::Load(LoadError::ChecksumMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_parse_error_leaves_installation_untouched() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let existing = temp.path().join("install/web/index.html");
        std::fs::create_dir_all(existing.parent().expect("parent")).expect("mkdir");
        std::fs::write(&existing, "previous").expect("write");

        let mut writer = MockPlanWriter::new();
        writer.expect_save().times(0);
        let mut orch = orchestrator(&temp, source_with(String::from("mission: [unclosed")), writer);

        let result = orch.check_for_updated_plan().await;

        assert!(matches!(result, Err(DeployError::Plan(PlanError::Parse { .. }))));
        assert_eq!(std::fs::read_to_string(&existing).expect("read"), "previous");
        assert!(!temp.path().join("repository").exists());
        assert!(orch.last_plan().is_none());
    }

    #[tokio::test]
    async fn test_empty_plan_is_clean_only_pass() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let stale = temp.path().join("install/old/file");
        std::fs::create_dir_all(stale.parent().expect("parent")).expect("mkdir");
        std::fs::write(&stale, "stale").expect("write");

        let mut writer = MockPlanWriter::new();
        writer
            .expect_save()
            .times(1)
            .withf(|status| status.units.is_empty())
            .returning(|_| Ok(()));

        let mut orch = orchestrator(
            &temp,
            source_with(String::from("mission: alpha\ndeployments: []\n")),
            writer,
        );
        let outcome = orch.check_for_updated_plan().await.expect("pass");

        assert!(matches!(outcome, PassOutcome::Reconciled(ref r) if r.units == 0));
        assert!(is_empty_dir(&temp.path().join("install")));
        let plan = orch.last_plan().expect("plan");
        assert!(plan.repository_version_dir().is_dir());
    }

    #[tokio::test]
    async fn test_reload_delegates_to_source() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let mut source = MockPlanSource::new();
        source.expect_reload().times(1).return_const(());

        let mut orch = orchestrator(&temp, source, MockPlanWriter::new());
        orch.reload();
    }

    #[tokio::test]
    async fn test_build_source_requires_location() {
        let config = DeployConfig::default();
        let result = build_source(&config).await;
        assert!(matches!(result, Err(DeployError::Config(_))));
    }
}
