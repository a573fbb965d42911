use serde::{Deserialize, Serialize};

/// User agent sent when fetching pages for link previews.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Top-level application settings container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub server: ServerSettings,
    pub metadata: MetadataSettings,
    pub form: FormSettings,
    pub storage: StorageSettings,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Origins allowed to call the API from a browser.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// Metadata extraction and caching settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetadataSettings {
    pub user_agent: String,
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    /// No timeout beyond the transport's own when unset.
    pub fetch_timeout_secs: Option<u64>,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_ttl_secs: 3600,
            cache_capacity: 256,
            fetch_timeout_secs: None,
        }
    }
}

/// Add-bookmark form behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormSettings {
    /// Quiet period after the last URL edit before a lookup fires.
    pub debounce_ms: u64,
    /// Shortest URL (after trimming) that triggers a lookup.
    pub min_url_len: usize,
    /// Base URL of the metadata endpoint. Lookups run in-process when unset.
    pub metadata_endpoint: Option<String>,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            min_url_len: 10,
            metadata_endpoint: None,
        }
    }
}

/// Local persistence settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite file path. Defaults to `remarkable.db` in the platform data dir.
    pub database_path: Option<String>,
}
