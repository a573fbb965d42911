use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

// === MetadataError ===

/// Errors raised while extracting link-preview metadata from a page.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// No target URL was supplied.
    #[error("URL is required")]
    MissingUrl,
    /// The HTTP request to the target page failed.
    #[error("Failed to fetch page: {0}")]
    Fetch(String),
    /// The target page answered with a non-success status.
    #[error("Upstream returned status {0}")]
    UpstreamStatus(u16),
    /// The page body could not be read or a value could not be resolved.
    #[error("Failed to parse page: {0}")]
    Parse(String),
    /// The metadata endpoint rejected a lookup.
    #[error("Metadata endpoint returned {status}: {message}")]
    Endpoint { status: u16, message: String },
}

impl From<reqwest::Error> for MetadataError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => MetadataError::UpstreamStatus(status.as_u16()),
            None => MetadataError::Fetch(err.to_string()),
        }
    }
}

// === StoreError ===

/// Errors related to bookmark store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Bookmark with the given ID was not found for this user.
    #[error("Bookmark not found: {0}")]
    NotFound(String),
    /// The record failed validation before being written.
    #[error("Invalid bookmark: {0}")]
    Invalid(String),
    /// Database operation failed.
    #[error("Bookmark database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

// === AuthError ===

/// Errors related to authentication and session handling.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity presented at sign-in was rejected.
    #[error("Sign-in failed: {0}")]
    SignInFailed(String),
    /// The sign-in provider is not supported.
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),
    /// Database operation failed.
    #[error("Auth database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for AuthError {
    fn from(err: rusqlite::Error) -> Self {
        AuthError::Database(err.to_string())
    }
}

// === FormError ===

/// Errors produced by the add-bookmark form.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("Title is required")]
    MissingTitle,
    #[error("URL is required")]
    MissingUrl,
    /// A submission is already in flight.
    #[error("A submission is already in progress")]
    Busy,
    /// The store rejected the write.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// === SettingsError ===

/// Errors related to loading and saving application settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(String),
    #[error("Settings serialization error: {0}")]
    Serialization(String),
    /// The key does not name a known setting.
    #[error("Unknown setting: {0}")]
    UnknownKey(String),
    /// The value has the wrong shape for the setting.
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

// === ApiError ===

/// Errors returned by HTTP handlers.
///
/// The response body never carries the underlying cause; handlers log it
/// before converting.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("URL is required")]
    MissingUrl,
    #[error("Failed to fetch metadata")]
    MetadataFailed,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingUrl => StatusCode::BAD_REQUEST,
            ApiError::MetadataFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<MetadataError> for ApiError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::MissingUrl => ApiError::MissingUrl,
            _ => ApiError::MetadataFailed,
        }
    }
}
