//! In-memory cache for extracted page metadata.
//!
//! Previews are keyed by the exact URL the client asked for. Entries expire
//! on the tokio clock so a paused test runtime can step past the TTL.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use crate::services::metadata_extractor::MetadataSource;
use crate::types::errors::MetadataError;
use crate::types::metadata::PageMetadata;

/// Page previews with a fixed lifetime and a bounded number of URLs.
pub struct MetadataCache {
    pages: HashMap<String, CachedPage>,
    ttl: Duration,
    capacity: usize,
    /// Bumped on every store; the smallest live value is evicted first.
    stored: u64,
}

struct CachedPage {
    metadata: PageMetadata,
    expires_at: Instant,
    stored: u64,
}

impl MetadataCache {
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            pages: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
            stored: 0,
        }
    }

    /// The preview stored for `url`, unless it has expired.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<&PageMetadata> {
        let now = Instant::now();
        self.pages
            .get(url)
            .filter(|page| page.expires_at > now)
            .map(|page| &page.metadata)
    }

    /// Stores the preview for `url`. Re-storing a known URL refreshes it in
    /// place; a new URL on a full cache first drops expired previews, then
    /// the least recently stored one.
    pub fn insert(&mut self, url: String, metadata: PageMetadata) {
        if !self.pages.contains_key(&url) && self.pages.len() >= self.capacity {
            self.purge_expired();
            if self.pages.len() >= self.capacity {
                self.evict_least_recent();
            }
        }
        self.stored += 1;
        self.pages.insert(
            url,
            CachedPage {
                metadata,
                expires_at: Instant::now() + self.ttl,
                stored: self.stored,
            },
        );
    }

    pub fn purge_expired(&mut self) {
        let now = Instant::now();
        self.pages.retain(|_, page| page.expires_at > now);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    fn evict_least_recent(&mut self) {
        let victim = self
            .pages
            .iter()
            .min_by_key(|(_, page)| page.stored)
            .map(|(url, _)| url.clone());
        if let Some(url) = victim {
            debug!(url = %url, "evicting cached preview");
            self.pages.remove(&url);
        }
    }
}

/// A [`MetadataSource`] that answers from a [`MetadataCache`] before asking
/// the wrapped source. Only successful lookups are cached.
pub struct CachedMetadata<S> {
    inner: S,
    cache: Mutex<MetadataCache>,
}

impl<S: MetadataSource> CachedMetadata<S> {
    pub fn new(inner: S, ttl: Duration, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(MetadataCache::new(ttl, capacity)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MetadataCache> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl<S: MetadataSource> MetadataSource for CachedMetadata<S> {
    async fn lookup(&self, url: &str) -> Result<PageMetadata, MetadataError> {
        let cached = self.lock().get(url).cloned();
        if let Some(hit) = cached {
            debug!(url, "metadata cache hit");
            return Ok(hit);
        }

        let metadata = self.inner.lookup(url).await?;
        self.lock().insert(url.to_string(), metadata.clone());
        Ok(metadata)
    }
}
