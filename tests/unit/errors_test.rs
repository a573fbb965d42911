use axum::http::StatusCode;
use axum::response::IntoResponse;
use remarkable::types::errors::*;

// === MetadataError Tests ===

#[test]
fn metadata_error_missing_url_display() {
    assert_eq!(MetadataError::MissingUrl.to_string(), "URL is required");
}

#[test]
fn metadata_error_upstream_status_display() {
    let err = MetadataError::UpstreamStatus(404);
    assert_eq!(err.to_string(), "Upstream returned status 404");
}

#[test]
fn metadata_error_endpoint_display() {
    let err = MetadataError::Endpoint {
        status: 500,
        message: "Failed to fetch metadata".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Metadata endpoint returned 500: Failed to fetch metadata"
    );
}

// === StoreError Tests ===

#[test]
fn store_error_not_found_display() {
    let err = StoreError::NotFound("bm-1".to_string());
    assert_eq!(err.to_string(), "Bookmark not found: bm-1");
}

#[test]
fn store_error_from_rusqlite() {
    let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(matches!(err, StoreError::Database(_)));
}

// === FormError Tests ===

#[test]
fn form_error_store_is_transparent() {
    let err: FormError = StoreError::Invalid("title is required".to_string()).into();
    assert_eq!(err.to_string(), "Invalid bookmark: title is required");
}

#[test]
fn form_error_implements_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(FormError::MissingTitle);
    assert_eq!(err.to_string(), "Title is required");
}

// === AuthError Tests ===

#[test]
fn auth_error_unsupported_provider_display() {
    let err = AuthError::UnsupportedProvider("myspace".to_string());
    assert_eq!(err.to_string(), "Unsupported provider: myspace");
}

// === SettingsError Tests ===

#[test]
fn settings_error_invalid_value_display() {
    let err = SettingsError::InvalidValue {
        key: "server.port".to_string(),
        reason: "expected u16".to_string(),
    };
    assert_eq!(err.to_string(), "Invalid value for server.port: expected u16");
}

// === ApiError Tests ===

#[test]
fn api_error_status_codes() {
    assert_eq!(ApiError::MissingUrl.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ApiError::MetadataFailed.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn api_error_hides_underlying_cause() {
    let err: ApiError = MetadataError::Fetch("dns error: no such host".to_string()).into();
    assert_eq!(err.to_string(), "Failed to fetch metadata");

    let err: ApiError = MetadataError::UpstreamStatus(503).into();
    assert!(matches!(err, ApiError::MetadataFailed));
}

#[test]
fn api_error_missing_url_maps_to_bad_request() {
    let err: ApiError = MetadataError::MissingUrl.into();
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
}
