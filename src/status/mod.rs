//! Status publishing module for the deployment orchestrator.
//!
//! After every successful reconciliation pass the orchestrator publishes a
//! status document reflecting which units were loaded and installed.

mod local;
mod s3;
mod types;
mod writer;

pub use local::{LocalStatusWriter, STATUS_FILE};
pub use s3::S3StatusWriter;
pub use types::{PlanStatus, UnitStatus, STATUS_VERSION};
pub use writer::PlanWriter;

#[cfg(test)]
pub use writer::MockPlanWriter;
