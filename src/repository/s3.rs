//! S3 artifact backend.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use crate::aws::{join_key, s3_client};

use super::fetcher::ArtifactFetcher;

/// Reads artifacts from an S3 bucket. The plan's artifact root is used as a
/// key prefix within the bucket.
#[derive(Debug, Clone)]
pub struct S3ArtifactFetcher {
    client: Client,
    bucket: String,
}

impl S3ArtifactFetcher {
    /// Creates a fetcher from the ambient AWS configuration.
    pub async fn new(bucket: &str, region: Option<&str>) -> Self {
        Self::with_client(s3_client(region).await, bucket)
    }

    /// Creates a fetcher with an existing client.
    #[must_use]
    pub fn with_client(client: Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl ArtifactFetcher for S3ArtifactFetcher {
    async fn fetch(&self, root: &str, key: &str) -> Result<Bytes, String> {
        let object_key = join_key(root, key);
        debug!("Fetching artifact from s3://{}/{object_key}", self.bucket);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| format!("S3 get error: {}", e.into_service_error()))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| format!("Failed to read S3 object: {e}"))?;

        Ok(data.into_bytes())
    }

    fn location(&self, root: &str, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, join_key(root, key))
    }

    fn backend_type(&self) -> &'static str {
        "s3"
    }
}
