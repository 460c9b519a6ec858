//! Shared S3 client construction.
//!
//! The plan source, artifact fetcher, and status writer can each target S3;
//! they build their clients and key prefixes the same way.

use aws_sdk_s3::Client;

/// Creates an S3 client from the ambient AWS configuration.
pub async fn s3_client(region: Option<&str>) -> Client {
    let config = if let Some(region_str) = region {
        aws_config::from_env()
            .region(aws_config::Region::new(region_str.to_string()))
            .load()
            .await
    } else {
        aws_config::load_from_env().await
    };

    Client::new(&config)
}

/// Normalizes an optional key prefix to either empty or `prefix/`.
#[must_use]
pub fn normalize_prefix(prefix: Option<&str>) -> String {
    prefix
        .map(|p| {
            let p = p.trim_matches('/');
            if p.is_empty() {
                String::new()
            } else {
                format!("{p}/")
            }
        })
        .unwrap_or_default()
}

/// Joins a prefix and a key into an object key.
#[must_use]
pub fn join_key(prefix: &str, key: &str) -> String {
    format!("{}{}", normalize_prefix(Some(prefix)), key.trim_start_matches('/'))
}
