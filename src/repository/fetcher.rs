//! Artifact fetcher trait definition.
//!
//! A fetcher is the storage strategy the loader delegates to. The loader
//! stays backend-agnostic; backends only know how to turn a root and a key
//! into bytes.

use async_trait::async_trait;
use bytes::Bytes;

/// Trait for artifact storage backends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Fetches the complete artifact stored under `key` within `root`.
    ///
    /// Errors are returned as plain descriptions; the loader wraps them
    /// with the unit context.
    async fn fetch(&self, root: &str, key: &str) -> Result<Bytes, String>;

    /// Describes where an artifact lives, for logs and error messages.
    fn location(&self, root: &str, key: &str) -> String;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}
