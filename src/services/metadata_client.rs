//! HTTP client for the `/api/metadata` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::services::metadata_extractor::MetadataSource;
use crate::types::errors::MetadataError;
use crate::types::metadata::PageMetadata;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Looks up metadata through a running ReMarkable server.
pub struct MetadataApiClient {
    client: Client,
    base_url: String,
}

impl MetadataApiClient {
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl MetadataSource for MetadataApiClient {
    async fn lookup(&self, url: &str) -> Result<PageMetadata, MetadataError> {
        let endpoint = format!("{}/api/metadata", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&endpoint)
            .query(&[("url", url)])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<PageMetadata>()
                .await
                .map_err(|e| MetadataError::Parse(e.to_string()));
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };
        Err(MetadataError::Endpoint {
            status: status.as_u16(),
            message,
        })
    }
}
