use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A saved bookmark as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub title: String,
    /// Stored verbatim; may lack a scheme.
    pub url: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new bookmark. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBookmark {
    pub user_id: String,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub is_pinned: bool,
}

/// A change to one user's bookmarks, as delivered by the store's change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    Insert { new: Bookmark },
    Update {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        old: Option<Bookmark>,
        new: Bookmark,
    },
    Delete { id: String },
}
