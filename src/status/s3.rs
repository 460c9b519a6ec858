//! S3-based status backend.
//!
//! Publishes the status document to AWS S3 (or a compatible service) so a
//! fleet of appliances can be observed from one place.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::aws::{normalize_prefix, s3_client};
use crate::error::{Result, StatusError};

use super::local::STATUS_FILE;
use super::types::PlanStatus;
use super::writer::PlanWriter;

/// S3-based status writer.
#[derive(Debug)]
pub struct S3StatusWriter {
    /// S3 client.
    client: Client,
    /// Bucket name.
    bucket: String,
    /// Key prefix.
    prefix: String,
}

impl S3StatusWriter {
    /// Creates a new S3 status writer from the ambient AWS configuration.
    pub async fn new(bucket: &str, prefix: Option<&str>, region: Option<&str>) -> Self {
        let client = s3_client(region).await;
        Self::with_client(client, bucket, prefix)
    }

    /// Creates a new S3 status writer with an existing client.
    #[must_use]
    pub fn with_client(client: Client, bucket: &str, prefix: Option<&str>) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            prefix: normalize_prefix(prefix),
        }
    }

    /// Gets the full S3 key of the status document.
    fn key(&self) -> String {
        format!("{}{STATUS_FILE}", self.prefix)
    }
}

#[async_trait]
impl PlanWriter for S3StatusWriter {
    async fn save(&self, status: &PlanStatus) -> Result<()> {
        let key = self.key();
        info!("Writing status to s3://{}/{key}", self.bucket);

        let content = serde_json::to_string_pretty(status).map_err(|e| {
            StatusError::serialization(format!("Failed to serialize status: {e}"))
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(content.into_bytes().into())
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| StatusError::s3(format!("S3 put error: {e}")))?;

        debug!("Status written successfully to S3");
        Ok(())
    }

    async fn load(&self) -> Result<Option<PlanStatus>> {
        let key = self.key();
        debug!("Loading status from s3://{}/{key}", self.bucket);

        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await;

        match result {
            Ok(response) => {
                let bytes = response
                    .body
                    .collect()
                    .await
                    .map_err(|e| StatusError::s3(format!("Failed to read S3 object: {e}")))?
                    .into_bytes();

                let status: PlanStatus = serde_json::from_slice(&bytes).map_err(|e| {
                    StatusError::Corrupted {
                        message: format!("Failed to parse status: {e}"),
                    }
                })?;

                Ok(Some(status))
            }
            Err(sdk_err) => {
                let service_err = sdk_err.into_service_error();
                if service_err.is_no_such_key() {
                    debug!("No status found in S3");
                    Ok(None)
                } else {
                    Err(StatusError::s3(format!("S3 get error: {service_err}")).into())
                }
            }
        }
    }

    fn backend_type(&self) -> &'static str {
        "s3"
    }
}
