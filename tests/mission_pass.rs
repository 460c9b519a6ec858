//! End-to-end reconciliation passes against the local filesystem backends.

use std::io::{Cursor, Write};
use std::path::Path;

use appliance_deploy::config::DeployConfig;
use appliance_deploy::orchestrator::{MissionOrchestrator, PassOutcome};
use appliance_deploy::plan::{ConfigTree, ConfigValue};
use appliance_deploy::repository::sha256_hex;
use appliance_deploy::status::{LocalStatusWriter, PlanWriter};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn zip_of(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start entry");
        writer.write_all(content.as_bytes()).expect("write entry");
    }
    writer.finish().expect("finish").into_inner()
}

fn plan_document(root: &Path, build: &str, checksum: &str) -> String {
    format!(
        r"
mission: alpha
installation_root: {install}
repository_root: {repository}
deployments:
  - alias: web
    build: '{build}'
    key: web-{build}.zip
    checksum: '{checksum}'
    environment_configuration:
      port: 8080
      features: [search, upload]
    mission_configuration:
      site: north
  - alias: worker
    build: '2.0'
    key: worker.zip
    deploy: false
",
        install = root.join("install").display(),
        repository = root.join("repository").display(),
    )
}

fn settings(root: &Path) -> DeployConfig {
    let mut config = DeployConfig::default();
    config.source.path = Some(root.join("plan.yaml").display().to_string());
    config.repository.root = Some(root.join("artifacts").display().to_string());
    config.status.path = Some(root.join("status.json"));
    config
}

fn publish(root: &Path, name: &str, data: &[u8]) {
    let dir = root.join("artifacts");
    std::fs::create_dir_all(&dir).expect("mkdir");
    std::fs::write(dir.join(name), data).expect("write artifact");
}

fn read_tree(path: &Path) -> ConfigTree {
    serde_json::from_str(&std::fs::read_to_string(path).expect("read")).expect("parse")
}

#[tokio::test]
async fn test_pass_installs_then_follows_plan_updates() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let root = temp.path();

    let first = zip_of(&[("index.html", "v1"), ("bin/serve", "#!/bin/sh")]);
    publish(root, "web-1.0.zip", &first);
    std::fs::write(root.join("plan.yaml"), plan_document(root, "1.0", &sha256_hex(&first)))
        .expect("write plan");

    let mut orch = MissionOrchestrator::from_config(&settings(root))
        .await
        .expect("orchestrator");
    orch.start().await.expect("start");

    let PassOutcome::Reconciled(report) = orch.check_for_updated_plan().await.expect("first pass")
    else {
        panic!("first pass should reconcile");
    };
    assert_eq!(report.installed, 1);
    let first_version = report.repository_version.clone();

    let web = root.join("install/web");
    assert_eq!(std::fs::read_to_string(web.join("index.html")).expect("read"), "v1");
    assert!(web.join("bin/serve").is_file());
    assert!(!root.join("install/worker").exists());

    let environment = read_tree(&web.join("environment.json"));
    assert_eq!(environment.get("port"), Some(&ConfigValue::Integer(8080)));
    assert_eq!(
        environment.get("features"),
        Some(&ConfigValue::List(vec![
            ConfigValue::from("search"),
            ConfigValue::from("upload"),
        ]))
    );
    assert_eq!(
        read_tree(&web.join("mission.json")).get("site"),
        Some(&ConfigValue::from("north"))
    );

    let status = LocalStatusWriter::with_status_path(root.join("status.json"))
        .load()
        .await
        .expect("load")
        .expect("status written");
    assert!(status.is_healthy());
    assert_eq!(status.repository_version, first_version);

    // Unchanged plan: nothing happens.
    assert_eq!(
        orch.check_for_updated_plan().await.expect("idle pass"),
        PassOutcome::NoChange
    );

    // A new build replaces the installation and the old cache generation. The
    // longer build label also changes the plan file's length.
    let second = zip_of(&[("index.html", "version two")]);
    publish(root, "web-1.10.zip", &second);
    std::fs::write(root.join("plan.yaml"), plan_document(root, "1.10", &sha256_hex(&second)))
        .expect("rewrite plan");

    let PassOutcome::Reconciled(report) = orch.check_for_updated_plan().await.expect("second pass")
    else {
        panic!("second pass should reconcile");
    };
    assert_ne!(report.repository_version, first_version);
    assert_eq!(
        std::fs::read_to_string(web.join("index.html")).expect("read"),
        "version two"
    );
    assert!(!web.join("bin/serve").exists());
    assert!(!root.join("repository").join(&first_version).exists());
    assert!(root
        .join("repository")
        .join(&report.repository_version)
        .join("web.zip")
        .is_file());
}

#[tokio::test]
async fn test_corrupted_artifact_fails_pass_and_reload_retries() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let root = temp.path();

    let good = zip_of(&[("index.html", "ok")]);
    publish(root, "web-1.0.zip", b"truncated download");
    std::fs::write(root.join("plan.yaml"), plan_document(root, "1.0", &sha256_hex(&good)))
        .expect("write plan");

    let mut orch = MissionOrchestrator::from_config(&settings(root))
        .await
        .expect("orchestrator");
    orch.start().await.expect("start");

    assert!(orch.check_for_updated_plan().await.is_err());
    let plan = orch.last_plan().expect("failed plan kept");
    assert!(!plan.unit("web").expect("web").has_loaded);
    assert!(!root.join("install/web").exists());
    let status = LocalStatusWriter::with_status_path(root.join("status.json"))
        .load()
        .await
        .expect("load")
        .expect("failed pass still publishes");
    assert!(!status.is_healthy());

    // Same plan, artifact repaired: only an explicit reload retries.
    publish(root, "web-1.0.zip", &good);
    assert_eq!(
        orch.check_for_updated_plan().await.expect("no update"),
        PassOutcome::NoChange
    );

    orch.reload();
    assert!(matches!(
        orch.check_for_updated_plan().await.expect("retry"),
        PassOutcome::Reconciled(_)
    ));
    assert!(root.join("install/web/index.html").is_file());
}

#[tokio::test]
async fn test_failed_pass_replaces_healthy_status() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let root = temp.path();

    let good = zip_of(&[("index.html", "ok")]);
    publish(root, "web-1.0.zip", &good);
    std::fs::write(root.join("plan.yaml"), plan_document(root, "1.0", &sha256_hex(&good)))
        .expect("write plan");

    let mut orch = MissionOrchestrator::from_config(&settings(root))
        .await
        .expect("orchestrator");
    orch.start().await.expect("start");
    orch.check_for_updated_plan().await.expect("first pass");

    let writer = LocalStatusWriter::with_status_path(root.join("status.json"));
    let healthy = writer.load().await.expect("load").expect("status written");
    assert!(healthy.is_healthy());

    // Same plan, artifact corrupted in the store, pass forced.
    publish(root, "web-1.0.zip", b"truncated download");
    orch.reload();
    assert!(orch.check_for_updated_plan().await.is_err());

    assert!(!root.join("install/web").exists());
    let degraded = writer.load().await.expect("load").expect("status written");
    assert!(!degraded.is_healthy());
    assert_ne!(degraded.pass_id, healthy.pass_id);
    let web = degraded.unit("web").expect("web");
    assert!(!web.has_loaded);
    assert!(!web.has_installed);
}
