//! Plan writer trait definition.
//!
//! This module defines the common interface for status publishing backends.

use async_trait::async_trait;

use crate::error::Result;
use super::types::PlanStatus;

/// Trait for status publishing backends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanWriter: Send + Sync {
    /// Persists the status of a completed pass.
    async fn save(&self, status: &PlanStatus) -> Result<()>;

    /// Reads back the last persisted status.
    ///
    /// Returns `None` if no status has been written yet.
    async fn load(&self) -> Result<Option<PlanStatus>>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}
