// ReMarkable services
// Services provide core functionality: storage, change feed, auth, metadata extraction, settings.

pub mod auth_service;
pub mod bookmark_store;
pub mod change_feed;
pub mod html_meta;
pub mod metadata_cache;
pub mod metadata_client;
pub mod metadata_extractor;
pub mod settings_engine;
