//! Bookmark store for ReMarkable.
//!
//! Defines `BookmarkStore`, the collaborator the form and list view write
//! through, and a SQLite-backed implementation that publishes every
//! committed write on a per-user change feed.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use crate::database::connection::Database;
use crate::services::change_feed::{ChangeFeed, ChangeSubscription};
use crate::types::bookmark::{Bookmark, ChangeEvent, NewBookmark};
use crate::types::errors::StoreError;

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, title, url, description, image_url, tags, is_pinned, created_at FROM bookmarks";

/// Operations the application needs from the bookmark backend.
///
/// Every operation is scoped to one user; records owned by other users are
/// invisible and immutable through it.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Inserts a record. The store assigns `id` and `created_at`.
    async fn insert(&self, new: NewBookmark) -> Result<Bookmark, StoreError>;
    /// Sets the pin flag of one record.
    async fn set_pinned(&self, user_id: &str, id: &str, pinned: bool) -> Result<Bookmark, StoreError>;
    async fn delete(&self, user_id: &str, id: &str) -> Result<(), StoreError>;
    /// All of a user's records, pinned first, newest first within each group.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Bookmark>, StoreError>;
    /// Opens a change subscription for `user_id`.
    fn subscribe(&self, user_id: &str) -> ChangeSubscription;
}

/// Bookmark store backed by SQLite.
pub struct SqliteBookmarkStore {
    db: Arc<Database>,
    feed: ChangeFeed,
    last_created_ms: AtomicI64,
}

impl SqliteBookmarkStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            feed: ChangeFeed::new(),
            last_created_ms: AtomicI64::new(0),
        }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Fetches one record owned by `user_id`.
    pub fn get(&self, user_id: &str, id: &str) -> Result<Option<Bookmark>, StoreError> {
        let conn = self.db.connection();
        Self::get_with(&conn, user_id, id)
    }

    fn get_with(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Bookmark>, StoreError> {
        let bookmark = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1 AND user_id = ?2"),
                params![id, user_id],
                Self::row_to_bookmark,
            )
            .optional()?;
        Ok(bookmark)
    }

    /// Millisecond creation timestamp, strictly increasing within this store
    /// so rapid inserts keep a stable newest-first order.
    fn next_created_at(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_millis();
        let mut previous = self.last_created_ms.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(previous + 1);
            match self.last_created_ms.compare_exchange(
                previous,
                candidate,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return millis_to_datetime(candidate),
                Err(actual) => previous = actual,
            }
        }
    }

    /// Reads a single `Bookmark` row into a struct.
    fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
        let tags_json: String = row.get(6)?;
        let tags: Vec<String> = serde_json::from_str(&tags_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
        let created_ms: i64 = row.get(8)?;

        Ok(Bookmark {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            url: row.get(3)?,
            description: row.get(4)?,
            image_url: row.get(5)?,
            tags,
            is_pinned: row.get(7)?,
            created_at: millis_to_datetime(created_ms),
        })
    }
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}

#[async_trait]
impl BookmarkStore for SqliteBookmarkStore {
    async fn insert(&self, new: NewBookmark) -> Result<Bookmark, StoreError> {
        if new.user_id.trim().is_empty() {
            return Err(StoreError::Invalid("user_id is required".to_string()));
        }
        if new.title.trim().is_empty() {
            return Err(StoreError::Invalid("title is required".to_string()));
        }
        if new.url.trim().is_empty() {
            return Err(StoreError::Invalid("url is required".to_string()));
        }

        // Held until the event is published so feed order matches commit order.
        let conn = self.db.connection();
        let bookmark = Bookmark {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            title: new.title,
            url: new.url,
            description: new.description,
            image_url: new.image_url,
            tags: new.tags,
            is_pinned: new.is_pinned,
            created_at: self.next_created_at(),
        };
        let tags_json = serde_json::to_string(&bookmark.tags)
            .map_err(|e| StoreError::Invalid(format!("tags: {}", e)))?;

        conn.execute(
            "INSERT INTO bookmarks (id, user_id, title, url, description, image_url, tags, is_pinned, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                bookmark.id,
                bookmark.user_id,
                bookmark.title,
                bookmark.url,
                bookmark.description,
                bookmark.image_url,
                tags_json,
                bookmark.is_pinned,
                bookmark.created_at.timestamp_millis(),
            ],
        )?;

        debug!(id = %bookmark.id, user_id = %bookmark.user_id, "bookmark inserted");
        self.feed.publish(
            &bookmark.user_id,
            ChangeEvent::Insert {
                new: bookmark.clone(),
            },
        );
        Ok(bookmark)
    }

    async fn set_pinned(&self, user_id: &str, id: &str, pinned: bool) -> Result<Bookmark, StoreError> {
        let conn = self.db.connection();
        let old = Self::get_with(&conn, user_id, id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        conn.execute(
            "UPDATE bookmarks SET is_pinned = ?1 WHERE id = ?2 AND user_id = ?3",
            params![pinned, id, user_id],
        )?;

        let new = Bookmark {
            is_pinned: pinned,
            ..old.clone()
        };
        self.feed.publish(
            user_id,
            ChangeEvent::Update {
                old: Some(old),
                new: new.clone(),
            },
        );
        Ok(new)
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let conn = self.db.connection();
        let affected = conn.execute(
            "DELETE FROM bookmarks WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        self.feed.publish(user_id, ChangeEvent::Delete { id: id.to_string() });
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Bookmark>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY is_pinned DESC, created_at DESC, id DESC"
        ))?;

        let rows = stmt.query_map(params![user_id], Self::row_to_bookmark)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn subscribe(&self, user_id: &str) -> ChangeSubscription {
        self.feed.subscribe(user_id)
    }
}
