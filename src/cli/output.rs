//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use std::path::Path;
use tabled::{Table, Tabled};

use crate::orchestrator::{PassOutcome, ReconciliationReport};
use crate::plan::Plan;
use crate::status::{PlanStatus, UnitStatus};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Unit status row for table display.
#[derive(Tabled)]
struct UnitStatusRow {
    #[tabled(rename = "Alias")]
    alias: String,
    #[tabled(rename = "Build")]
    build: String,
    #[tabled(rename = "Deploy")]
    deploy: String,
    #[tabled(rename = "Loaded")]
    loaded: String,
    #[tabled(rename = "Installed")]
    installed: String,
    #[tabled(rename = "Location")]
    location: String,
}

/// Plan unit row for table display.
#[derive(Tabled)]
struct PlanUnitRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Alias")]
    alias: String,
    #[tabled(rename = "Build")]
    build: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Checksum")]
    checksum: String,
    #[tabled(rename = "Deploy")]
    deploy: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a published status document.
    #[must_use]
    pub fn format_status(&self, status: Option<&PlanStatus>) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&status).unwrap_or_default(),
            OutputFormat::Text => status.map_or_else(
                || format!("{} No status has been published yet.\n", "⚠".yellow()),
                Self::format_status_text,
            ),
        }
    }

    fn format_status_text(status: &PlanStatus) -> String {
        let mut output = String::new();

        let _ = write!(output, "\n📦 Mission: {}\n\n", status.mission);
        let _ = writeln!(output, "   Repository version: {}", status.repository_version);
        let _ = writeln!(output, "   Installation root: {}", status.installation_root.display());
        let _ = writeln!(
            output,
            "   Completed: {}",
            status.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(output, "   Pass: {}\n", status.pass_id);

        if status.units.is_empty() {
            output.push_str("   No deployment units in plan.\n");
            return output;
        }

        let rows: Vec<UnitStatusRow> = status.units.iter().map(Self::status_row).collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let health = if status.is_healthy() {
            "healthy".green().to_string()
        } else {
            "degraded".red().to_string()
        };
        let installed = status.units.iter().filter(|u| u.has_installed).count();
        let deployable = status.units.iter().filter(|u| u.deploy).count();
        let _ = write!(
            output,
            "\nStatus: {health} ({installed}/{deployable} deployable units installed)\n"
        );

        output
    }

    fn status_row(unit: &UnitStatus) -> UnitStatusRow {
        UnitStatusRow {
            alias: unit.alias.clone(),
            build: unit.build.clone(),
            deploy: Self::flag(unit.deploy, "yes", "skip"),
            loaded: Self::check(unit.has_loaded, unit.deploy),
            installed: Self::check(unit.has_installed, unit.deploy),
            location: Self::truncate(&unit.installation_location.display().to_string(), 40),
        }
    }

    /// Formats the outcome of a single pass.
    #[must_use]
    pub fn format_outcome(&self, outcome: &PassOutcome) -> String {
        match outcome {
            PassOutcome::NoChange => match self.format {
                OutputFormat::Json => serde_json::json!({ "outcome": "no_change" }).to_string(),
                OutputFormat::Text => {
                    format!("{} No plan update - nothing to reconcile.\n", "✓".green())
                }
            },
            PassOutcome::Reconciled(report) => self.format_report(report),
        }
    }

    /// Formats a reconciliation report.
    #[must_use]
    pub fn format_report(&self, report: &ReconciliationReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "outcome": "reconciled",
                "mission": report.mission,
                "repository_version": report.repository_version,
                "pass_id": report.pass_id,
                "units": report.units,
                "loaded": report.loaded,
                "installed": report.installed,
                "skipped": report.skipped(),
            }))
            .unwrap_or_default(),
            OutputFormat::Text => format!("{} {report}", "✓".green()),
        }
    }

    /// Formats a validated plan summary.
    #[must_use]
    pub fn format_plan(&self, plan: &Plan) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "mission": plan.name,
                "repository_version": crate::plan::repository_version_for(&plan.content_digest),
                "installation_root": plan.installation_root,
                "repository_root": plan.repository_root,
                "artifact_root": plan.artifact_root,
                "units": plan.deployments.iter().map(|u| serde_json::json!({
                    "alias": u.alias,
                    "build": u.build,
                    "key": u.repository_location,
                    "checksum": u.checksum,
                    "deploy": u.deploy,
                })).collect::<Vec<_>>(),
            }))
            .unwrap_or_default(),
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    fn format_plan_text(plan: &Plan) -> String {
        let mut output = format!("{} Plan is valid.\n\n", "✓".green());

        let _ = writeln!(output, "   Mission: {}", plan.name);
        let _ = writeln!(
            output,
            "   Repository version: {}",
            crate::plan::repository_version_for(&plan.content_digest)
        );
        let _ = writeln!(output, "   Installation root: {}", plan.installation_root.display());
        let _ = writeln!(output, "   Units: {} ({} deployable)\n", plan.deployments.len(), plan.deployable_count());

        if !plan.deployments.is_empty() {
            let rows: Vec<PlanUnitRow> = plan
                .deployments
                .iter()
                .enumerate()
                .map(|(i, u)| PlanUnitRow {
                    index: i + 1,
                    alias: u.alias.clone(),
                    build: u.build.clone(),
                    key: Self::truncate(&u.repository_location, 40),
                    checksum: if u.has_checksum() {
                        Self::truncate(&u.checksum, 12)
                    } else {
                        "none".dimmed().to_string()
                    },
                    deploy: Self::flag(u.deploy, "yes", "skip"),
                })
                .collect();
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        let unchecked = plan
            .deployments
            .iter()
            .filter(|u| u.deploy && !u.has_checksum())
            .count();
        if unchecked > 0 {
            let _ = write!(
                output,
                "\n{} {unchecked} deployable unit(s) have no checksum and will install unverified.\n",
                "⚠".yellow()
            );
        }

        output
    }

    /// Formats an artifact checksum.
    #[must_use]
    pub fn format_checksum(&self, file: &Path, checksum: &str) -> String {
        match self.format {
            OutputFormat::Json => serde_json::json!({
                "file": file,
                "algorithm": "sha256",
                "checksum": checksum,
            })
            .to_string(),
            OutputFormat::Text => format!("{checksum}  {}", file.display()),
        }
    }

    fn flag(value: bool, yes: &str, no: &str) -> String {
        if value {
            yes.green().to_string()
        } else {
            no.dimmed().to_string()
        }
    }

    fn check(value: bool, applicable: bool) -> String {
        match (applicable, value) {
            (false, _) => "-".dimmed().to_string(),
            (true, true) => "✓".green().to_string(),
            (true, false) => "✗".red().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}
