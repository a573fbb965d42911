//! App Core for ReMarkable.
//!
//! Central struct wiring the database, bookmark store, auth provider and
//! metadata sources together from one set of settings.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use tracing::info;

use crate::database::connection::Database;
use crate::managers::bookmark_form::AddBookmarkForm;
use crate::managers::bookmark_list::BookmarkListView;
use crate::managers::session_manager::SessionManager;
use crate::platform;
use crate::services::auth_service::{AuthProvider, LocalAuthProvider};
use crate::services::bookmark_store::{BookmarkStore, SqliteBookmarkStore};
use crate::services::metadata_cache::CachedMetadata;
use crate::services::metadata_client::MetadataApiClient;
use crate::services::metadata_extractor::{MetadataExtractor, MetadataSource};
use crate::types::errors::{AuthError, MetadataError};
use crate::types::settings::AppSettings;

/// Central application struct.
pub struct App {
    pub settings: AppSettings,
    pub db: Arc<Database>,
    pub store: Arc<SqliteBookmarkStore>,
    pub auth: Arc<LocalAuthProvider>,
    /// In-process extractor behind the TTL cache; serves `/api/metadata`.
    pub metadata: Arc<dyn MetadataSource>,
    /// What the add form looks metadata up through.
    pub form_lookup: Arc<dyn MetadataSource>,
}

impl App {
    /// Opens the configured database file (or the platform default) and wires
    /// every component.
    pub fn new(settings: AppSettings) -> anyhow::Result<Self> {
        let db_path = settings
            .storage
            .database_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(platform::default_database_path);

        info!("Opening database at {}", db_path.display());
        let db = Database::open(&db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;
        Self::with_database(settings, db)
    }

    /// Same as [`App::new`] over an in-memory database.
    pub fn in_memory(settings: AppSettings) -> anyhow::Result<Self> {
        let db = Database::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_database(settings, db)
    }

    fn with_database(settings: AppSettings, db: Database) -> anyhow::Result<Self> {
        let db = Arc::new(db);
        let store = Arc::new(SqliteBookmarkStore::new(db.clone()));
        let auth = Arc::new(LocalAuthProvider::new(db.clone()).context("Auth init failed")?);

        let metadata = build_metadata_source(&settings).context("Metadata client init failed")?;
        let form_lookup = match &settings.form.metadata_endpoint {
            Some(endpoint) => {
                info!("Form lookups go through {}", endpoint);
                Arc::new(MetadataApiClient::new(Client::new(), endpoint.clone()))
                    as Arc<dyn MetadataSource>
            }
            None => metadata.clone(),
        };

        Ok(Self {
            settings,
            db,
            store,
            auth,
            metadata,
            form_lookup,
        })
    }

    pub fn metadata_ttl(&self) -> Duration {
        Duration::from_secs(self.settings.metadata.cache_ttl_secs)
    }

    pub fn bookmark_store(&self) -> Arc<dyn BookmarkStore> {
        self.store.clone()
    }

    pub fn auth_provider(&self) -> Arc<dyn AuthProvider> {
        self.auth.clone()
    }

    pub async fn session_manager(&self) -> Result<SessionManager, AuthError> {
        SessionManager::start(self.auth_provider()).await
    }

    pub fn add_form(&self, user_id: &str) -> AddBookmarkForm {
        AddBookmarkForm::new(
            user_id,
            self.bookmark_store(),
            self.form_lookup.clone(),
            &self.settings.form,
        )
    }

    pub async fn list_view(&self, user_id: &str) -> BookmarkListView {
        BookmarkListView::mount(self.bookmark_store(), user_id).await
    }
}

/// The in-process extractor wrapped in the metadata cache.
pub fn build_metadata_source(settings: &AppSettings) -> Result<Arc<dyn MetadataSource>, MetadataError> {
    let extractor = MetadataExtractor::new(&settings.metadata)?;
    Ok(Arc::new(CachedMetadata::new(
        extractor,
        Duration::from_secs(settings.metadata.cache_ttl_secs),
        settings.metadata.cache_capacity,
    )))
}
