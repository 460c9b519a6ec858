//! Configuration service plan source.
//!
//! Issues conditional GET requests. When the service returns an `ETag`, it
//! is sent back as `If-None-Match` and a `304 Not Modified` means no update.
//! Services without `ETag` support are compared by body digest instead.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::error::{Result, SourceError};
use crate::repository::sha256_hex;

use super::traits::{resolve_location, PlanSource};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Plan source backed by an HTTP configuration service.
#[derive(Debug, Clone)]
pub struct HttpPlanSource {
    client: Client,
    url_template: String,
    mission: Option<String>,
    url: Option<String>,
    etag: Option<String>,
    token: Option<String>,
    content: Option<Bytes>,
}

impl HttpPlanSource {
    /// Creates a source for a URL template, which may contain `{mission}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(url: &str, mission: Option<String>) -> Result<Self> {
        Self::with_timeout(url, mission, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a source with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(url: &str, mission: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SourceError::StartFailed {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            url_template: url.to_string(),
            mission,
            url: None,
            etag: None,
            token: None,
            content: None,
        })
    }
}

#[async_trait]
impl PlanSource for HttpPlanSource {
    async fn start(&mut self) -> Result<()> {
        if self.url.is_some() {
            return Ok(());
        }
        let url = resolve_location(&self.url_template, self.mission.as_deref())?;
        info!("Watching plan document at {url}");
        self.url = Some(url);
        Ok(())
    }

    async fn check_for_update(&mut self) -> Result<bool> {
        let url = self.url.clone().ok_or(SourceError::NotStarted)?;

        let mut request = self.client.get(&url);
        if let Some(etag) = self.etag.as_deref().filter(|_| self.token.is_some()) {
            request = request.header(header::IF_NONE_MATCH, etag);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::unreachable(&url, e.to_string()))?;

        let status = response.status();
        trace!("Plan request to {url} returned {status}");

        if status == StatusCode::NOT_MODIFIED {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(SourceError::unreachable(&url, format!("HTTP {status}")).into());
        }

        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| SourceError::unreachable(&url, format!("Failed to read body: {e}")))?;

        let token = etag
            .clone()
            .unwrap_or_else(|| format!("sha256:{}", sha256_hex(&body)));

        if self.token.as_deref() == Some(token.as_str()) {
            return Ok(false);
        }

        debug!("Plan document changed ({} bytes, token {token})", body.len());
        self.content = Some(body);
        self.etag = etag;
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
        self.url.clone().unwrap_or_else(|| self.url_template.clone())
    }

    fn source_type(&self) -> &'static str {
        "http"
    }
}
