//! Repository module for the deployment orchestrator.
//!
//! This module handles everything about artifact bytes:
//! - Pluggable storage backends (local filesystem, S3)
//! - SHA-256 checksum verification
//! - The appliance loader and its per-version artifact cache

mod checksum;
mod fetcher;
mod loader;
mod local;
mod s3;

pub use checksum::{sha256_hex, verify, ChecksumOutcome};
pub use fetcher::ArtifactFetcher;
pub use loader::{cached_artifact_path, ApplianceLoader};
pub use local::FsArtifactFetcher;
pub use s3::S3ArtifactFetcher;

#[cfg(test)]
pub use fetcher::MockArtifactFetcher;
