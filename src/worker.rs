//! Poll loop driving the orchestrator.
//!
//! This is the external scheduler: it owns the orchestrator, calls it on a
//! fixed interval, and decides what happens to a failed pass. A failed pass
//! is logged and never ends the loop.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::{PollConfig, DEFAULT_POLL_INTERVAL_MS};
use crate::orchestrator::{MissionOrchestrator, PassOutcome};

/// Poller options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerOptions {
    /// Delay between passes.
    pub interval: Duration,
    /// Reload the plan source after a failed pass so the same plan is retried.
    pub reload_on_failure: bool,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            reload_on_failure: false,
        }
    }
}

impl From<&PollConfig> for PollerOptions {
    fn from(config: &PollConfig) -> Self {
        Self {
            interval: config.interval(),
            reload_on_failure: config.reload_on_failure,
        }
    }
}

/// Runs one pass and absorbs its failure.
///
/// Returns `true` if the pass succeeded or there was nothing to do.
pub async fn run_pass(orchestrator: &mut MissionOrchestrator, reload_on_failure: bool) -> bool {
    match orchestrator.check_for_updated_plan().await {
        Ok(PassOutcome::NoChange) => {
            debug!("No plan update");
            true
        }
        Ok(PassOutcome::Reconciled(report)) => {
            info!(
                "Pass complete for mission {}: {} of {} unit(s) installed",
                report.mission, report.installed, report.units
            );
            true
        }
        Err(e) => {
            error!("Reconciliation pass failed: {e}");
            if reload_on_failure {
                warn!("Reloading plan source so the next poll retries");
                orchestrator.reload();
            }
            false
        }
    }
}

/// Runs the poll loop until `shutdown` resolves.
///
/// A pass in flight is abandoned when shutdown fires.
pub async fn run<F>(options: PollerOptions, orchestrator: &mut MissionOrchestrator, shutdown: F)
where
    F: Future<Output = ()>,
{
    info!("Poller starting with interval {:?}", options.interval);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("Poller shutting down...");
                return;
            }
            _ = run_pass(orchestrator, options.reload_on_failure) => {}
        }

        tokio::select! {
            () = &mut shutdown => {
                info!("Poller shutting down...");
                return;
            }
            () = tokio::time::sleep(options.interval) => {}
        }
    }
}
