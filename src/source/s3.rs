//! S3 plan source.
//!
//! Polls the object's ETag (or version id) with `HeadObject` and only runs
//! `GetObject` when it changes.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, info};

use crate::aws::s3_client;
use crate::error::{Result, SourceError};
use crate::repository::sha256_hex;

use super::traits::{resolve_location, PlanSource};

/// Plan source backed by an S3 object.
#[derive(Debug, Clone)]
pub struct S3PlanSource {
    client: Client,
    bucket: String,
    key_template: String,
    mission: Option<String>,
    key: Option<String>,
    token: Option<String>,
    content: Option<Bytes>,
}

impl S3PlanSource {
    /// Creates a source from the ambient AWS configuration.
    ///
    /// `key` may contain `{mission}`.
    pub async fn new(bucket: &str, key: &str, region: Option<&str>, mission: Option<String>) -> Self {
        Self::with_client(s3_client(region).await, bucket, key, mission)
    }

    /// Creates a source with an existing client.
    #[must_use]
    pub fn with_client(client: Client, bucket: &str, key: &str, mission: Option<String>) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            key_template: key.to_string(),
            mission,
            key: None,
            token: None,
            content: None,
        }
    }

    async fn remote_token(&self, key: &str) -> Result<Option<String>> {
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| SourceError::unreachable(self.location(), e.into_service_error().to_string()))?;

        Ok(head
            .version_id()
            .or_else(|| head.e_tag())
            .map(str::to_string))
    }

    async fn download(&self, key: &str) -> Result<Bytes> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| SourceError::unreachable(self.location(), e.into_service_error().to_string()))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| SourceError::unreachable(self.location(), format!("Failed to read object: {e}")))?;

        Ok(data.into_bytes())
    }
}

/// True when the object's remote token matches the cached one, so no download is needed.
fn remote_unchanged(cached: Option<&str>, remote: Option<&str>) -> bool {
    remote.is_some() && remote == cached
}

/// Returns the new token for downloaded content, or `None` if it matches the
/// cached token. Objects without an ETag or version id are identified by content.
fn changed_token(cached: Option<&str>, remote: Option<String>, data: &[u8]) -> Option<String> {
    let token = remote.unwrap_or_else(|| format!("sha256:{}", sha256_hex(data)));
    (cached != Some(token.as_str())).then_some(token)
}

#[async_trait]
impl PlanSource for S3PlanSource {
    async fn start(&mut self) -> Result<()> {
        if self.key.is_some() {
            return Ok(());
        }
        let key = resolve_location(&self.key_template, self.mission.as_deref())?;
        info!("Watching plan object s3://{}/{key}", self.bucket);
        self.key = Some(key);
        Ok(())
    }

    async fn check_for_update(&mut self) -> Result<bool> {
        let key = self.key.clone().ok_or(SourceError::NotStarted)?;
        let remote = self.remote_token(&key).await?;

        if remote_unchanged(self.token.as_deref(), remote.as_deref()) {
            return Ok(false);
        }

        let data = self.download(&key).await?;
        let Some(token) = changed_token(self.token.as_deref(), remote, &data) else {
            return Ok(false);
        };

        debug!("Plan object changed ({} bytes, token {token})", data.len());
        self.content = Some(data);
        self.token = Some(token);
        Ok(true)
    }

    fn source(&self) -> Result<Bytes> {
        self.content.clone().ok_or_else(|| {
            SourceError::NoContent {
                location: self.location(),
            }
            .into()
        })
    }

    fn reload(&mut self) {
        debug!("Clearing cached plan token for {}", self.location());
        self.token = None;
    }

    fn location(&self) -> String {
        format!(
            "s3://{}/{}",
            self.bucket,
            self.key.as_deref().unwrap_or(&self.key_template)
        )
    }

    fn source_type(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &[u8] = b"mission: alpha\n";

    #[test]
    fn test_first_observation_is_a_change() {
        assert!(!remote_unchanged(None, Some("\"etag-1\"")));
        assert_eq!(
            changed_token(None, Some(String::from("\"etag-1\"")), PLAN).as_deref(),
            Some("\"etag-1\"")
        );
    }

    #[test]
    fn test_same_etag_skips_download() {
        assert!(remote_unchanged(Some("\"etag-1\""), Some("\"etag-1\"")));
        assert!(!remote_unchanged(Some("\"etag-1\""), Some("\"etag-2\"")));
    }

    #[test]
    fn test_missing_etag_always_downloads() {
        assert!(!remote_unchanged(None, None));
        assert!(!remote_unchanged(Some("sha256:abc"), None));
    }

    #[test]
    fn test_missing_etag_unchanged_content_is_no_update() {
        let first = changed_token(None, None, PLAN).expect("first read is a change");
        assert_eq!(first, format!("sha256:{}", sha256_hex(PLAN)));

        assert!(changed_token(Some(&first), None, PLAN).is_none());
        assert!(changed_token(Some(&first), None, b"mission: beta\n").is_some());
    }
}
