//! Link-preview metadata extraction.
//!
//! Fetches a page with a browser-like user agent and pulls its title,
//! description and preview image from Open Graph, Twitter card and standard
//! HTML tags.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::services::html_meta::HtmlHead;
use crate::types::errors::MetadataError;
use crate::types::metadata::PageMetadata;
use crate::types::settings::MetadataSettings;

/// Anything that can turn a page URL into link-preview metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn lookup(&self, url: &str) -> Result<PageMetadata, MetadataError>;
}

/// Fetches pages over HTTP and extracts their metadata.
#[derive(Clone)]
pub struct MetadataExtractor {
    client: Client,
}

impl MetadataExtractor {
    /// Builds an extractor whose client sends the configured user agent.
    pub fn new(settings: &MetadataSettings) -> Result<Self, MetadataError> {
        let mut builder = Client::builder().user_agent(settings.user_agent.clone());
        if let Some(secs) = settings.fetch_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| MetadataError::Fetch(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetches `url` and extracts its metadata.
    ///
    /// Any transport error, non-success status or unreadable body fails the
    /// whole lookup; no partial metadata is returned.
    pub async fn fetch(&self, url: &str) -> Result<PageMetadata, MetadataError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(MetadataError::MissingUrl);
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::UpstreamStatus(status.as_u16()));
        }

        let html = response
            .text()
            .await
            .map_err(|e| MetadataError::Parse(e.to_string()))?;
        debug!(url, bytes = html.len(), "fetched page for metadata");

        extract_metadata(&html, url)
    }
}

#[async_trait]
impl MetadataSource for MetadataExtractor {
    async fn lookup(&self, url: &str) -> Result<PageMetadata, MetadataError> {
        self.fetch(url).await
    }
}

/// Extracts metadata from an already-fetched document.
///
/// Priority: `og:title` then `<title>`; `og:description` then
/// `meta[name=description]`; `og:image` then `twitter:image`. A relative
/// image is resolved against `page_url`.
pub fn extract_metadata(html: &str, page_url: &str) -> Result<PageMetadata, MetadataError> {
    let head = HtmlHead::parse(html);

    let title = head
        .meta_property("og:title")
        .or_else(|| head.title())
        .unwrap_or_default();

    let description = head
        .meta_property("og:description")
        .or_else(|| head.meta_name("description"))
        .unwrap_or_default();

    let image = head
        .meta_property("og:image")
        .or_else(|| head.meta_name("twitter:image"))
        .unwrap_or_default();

    Ok(PageMetadata {
        title: title.trim().to_string(),
        description: description.trim().to_string(),
        image: resolve_image(image.trim(), page_url)?,
    })
}

/// Makes an image reference absolute.
///
/// Empty stays empty and `http(s)://` values are returned as-is; anything
/// else (root-relative, path-relative, protocol-relative) is joined onto
/// the page URL.
pub fn resolve_image(image: &str, page_url: &str) -> Result<String, MetadataError> {
    if image.is_empty() {
        return Ok(String::new());
    }
    if has_http_scheme(image) {
        return Ok(image.to_string());
    }

    let base = Url::parse(page_url)
        .map_err(|e| MetadataError::Parse(format!("invalid page URL {}: {}", page_url, e)))?;
    let resolved = base
        .join(image)
        .map_err(|e| MetadataError::Parse(format!("cannot resolve image {}: {}", image, e)))?;
    Ok(resolved.to_string())
}

fn has_http_scheme(value: &str) -> bool {
    let lower = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
