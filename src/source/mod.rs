//! Plan source module for the deployment orchestrator.
//!
//! This module watches the remote store of the plan document:
//! - A local file, compared by length and modification time
//! - An S3 object, compared by `ETag` or version id
//! - An HTTP configuration service, using conditional requests

mod http;
mod local;
mod s3;
mod traits;

pub use http::HttpPlanSource;
pub use local::LocalPlanSource;
pub use s3::S3PlanSource;
pub use traits::{has_updated_plan, resolve_location, resolve_mission, PlanSource, MISSION_PLACEHOLDER};

#[cfg(test)]
pub use traits::MockPlanSource;
