//! Filesystem artifact backend.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::fetcher::ArtifactFetcher;

/// Reads artifacts from a local or mounted directory.
///
/// A relative `root` is resolved against the fetcher's base directory; an
/// absolute one is used as is.
#[derive(Debug, Clone)]
pub struct FsArtifactFetcher {
    base_dir: PathBuf,
}

impl FsArtifactFetcher {
    /// Creates a fetcher resolving relative roots against `base_dir`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn resolve(&self, root: &str, key: &str) -> PathBuf {
        let root_dir = if root.is_empty() {
            self.base_dir.clone()
        } else {
            self.base_dir.join(Path::new(root))
        };
        root_dir.join(key.trim_start_matches('/'))
    }
}

#[async_trait]
impl ArtifactFetcher for FsArtifactFetcher {
    async fn fetch(&self, root: &str, key: &str) -> Result<Bytes, String> {
        let path = self.resolve(root, key);
        debug!("Reading artifact from: {}", path.display());

        fs::read(&path)
            .await
            .map(Bytes::from)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))
    }

    fn location(&self, root: &str, key: &str) -> String {
        self.resolve(root, key).display().to_string()
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}
