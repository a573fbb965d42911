//! Link-preview metadata endpoint

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::services::metadata_extractor::MetadataSource;
use crate::types::errors::ApiError;

/// Shared state for the metadata routes.
#[derive(Clone)]
pub struct MetadataState {
    pub source: Arc<dyn MetadataSource>,
    /// Advertised to clients as `Cache-Control: max-age`.
    pub cache_ttl: Duration,
}

pub fn metadata_routes() -> Router<MetadataState> {
    Router::new().route("/api/metadata", get(get_metadata))
}

#[derive(Debug, Deserialize)]
struct MetadataQuery {
    url: Option<String>,
}

async fn get_metadata(
    State(state): State<MetadataState>,
    query: Result<Query<MetadataQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    // A query string that doesn't decode (e.g. a repeated `url`) gets the same JSON 400.
    let Query(query) = query.map_err(|e| {
        tracing::warn!("Rejected metadata query: {}", e);
        ApiError::MissingUrl
    })?;
    let url = match query.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url,
        _ => return Err(ApiError::MissingUrl),
    };

    let metadata = state.source.lookup(url).await.map_err(|e| {
        tracing::error!("Metadata fetch error: {}", e);
        ApiError::from(e)
    })?;

    let cache_control = format!("public, max-age={}", state.cache_ttl.as_secs());
    let mut response = Json(metadata).into_response();
    if let Ok(value) = HeaderValue::from_str(&cache_control) {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    Ok(response)
}
