//! Bookmark list view model.
//!
//! Loads a user's bookmarks once, then keeps them current by folding change
//! feed events into the local collection. Pin toggles and deletes are sent to
//! the store; the local collection only changes when the feed confirms them.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{error, warn};

use crate::managers::delete_dialog::DeleteDialog;
use crate::services::bookmark_store::BookmarkStore;
use crate::services::change_feed::ChangeSubscription;
use crate::types::bookmark::{Bookmark, ChangeEvent};
use crate::types::errors::StoreError;

/// Display order: pinned first, then newest first.
///
/// Equal timestamps fall back to descending id so the order is total.
pub fn display_order(a: &Bookmark, b: &Bookmark) -> Ordering {
    b.is_pinned
        .cmp(&a.is_pinned)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}

pub fn sort_bookmarks(bookmarks: &mut [Bookmark]) {
    bookmarks.sort_by(display_order);
}

/// Case-insensitive substring match over title, URL and tags.
///
/// A blank term matches everything.
pub fn matches_search(bookmark: &Bookmark, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    bookmark.title.to_lowercase().contains(&term)
        || bookmark.url.to_lowercase().contains(&term)
        || bookmark
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&term))
}

/// Link target for a stored URL: values not starting with `http` get `https://`.
pub fn link_target(url: &str) -> String {
    if url.starts_with("http") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// URL as displayed in the list, without its `http://` or `https://` prefix.
pub fn display_url(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}

/// Folds one change event into a collection, keeping it sorted.
///
/// Deleting an id that is not present leaves the collection unchanged.
pub fn apply_change(bookmarks: &mut Vec<Bookmark>, event: ChangeEvent) {
    match event {
        ChangeEvent::Insert { new } | ChangeEvent::Update { new, .. } => {
            match bookmarks.iter_mut().find(|b| b.id == new.id) {
                Some(existing) => *existing = new,
                None => bookmarks.push(new),
            }
            sort_bookmarks(bookmarks);
        }
        ChangeEvent::Delete { id } => bookmarks.retain(|b| b.id != id),
    }
}

/// Live list of one user's bookmarks.
pub struct BookmarkListView {
    user_id: String,
    store: Arc<dyn BookmarkStore>,
    bookmarks: Vec<Bookmark>,
    search_term: String,
    loading: bool,
    dialog: DeleteDialog,
    subscription: Option<ChangeSubscription>,
}

impl BookmarkListView {
    /// Subscribes to the user's changes and performs the initial load.
    ///
    /// The subscription is opened first so writes landing during the load are
    /// still delivered. A failed load is logged and leaves the list empty.
    pub async fn mount(store: Arc<dyn BookmarkStore>, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let subscription = store.subscribe(&user_id);

        let mut view = Self {
            user_id,
            store,
            bookmarks: Vec::new(),
            search_term: String::new(),
            loading: true,
            dialog: DeleteDialog::new(),
            subscription: Some(subscription),
        };
        view.reload().await;
        view
    }

    /// Replaces the local collection with a fresh ordered read.
    pub async fn reload(&mut self) {
        self.loading = true;
        match self.store.list_for_user(&self.user_id).await {
            Ok(mut bookmarks) => {
                sort_bookmarks(&mut bookmarks);
                self.bookmarks = bookmarks;
            }
            Err(e) => error!(user_id = %self.user_id, "Error fetching bookmarks: {}", e),
        }
        self.loading = false;
    }

    /// Drops the change subscription.
    pub fn unmount(&mut self) {
        self.subscription = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn apply_change(&mut self, event: ChangeEvent) {
        apply_change(&mut self.bookmarks, event);
    }

    /// Waits for the next change event and applies it.
    ///
    /// Returns `false` once unmounted or the feed has closed.
    pub async fn next_change(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        match subscription.next().await {
            Some(event) => {
                self.apply_change(event);
                true
            }
            None => false,
        }
    }

    /// Applies every change already queued on the feed. Returns how many.
    pub fn drain_changes(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.subscription.as_mut().and_then(|s| s.try_next()) {
            self.apply_change(event);
            applied += 1;
        }
        applied
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The full subscribed collection in display order.
    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    /// Bookmarks matching the current search term, in display order.
    pub fn visible(&self) -> Vec<&Bookmark> {
        self.bookmarks
            .iter()
            .filter(|b| matches_search(b, &self.search_term))
            .collect()
    }

    /// Message for an empty visible list, distinguishing "no results" from
    /// "no bookmarks yet".
    pub fn empty_message(&self) -> Option<&'static str> {
        if !self.visible().is_empty() {
            return None;
        }
        if self.search_term.trim().is_empty() {
            Some("Empty Archive")
        } else {
            Some("No results found")
        }
    }

    /// Asks the store to flip the pin flag of `id`.
    ///
    /// The local collection is untouched; the feed delivers the update.
    pub async fn toggle_pin(&self, id: &str) -> Result<(), StoreError> {
        let Some(bookmark) = self.bookmarks.iter().find(|b| b.id == id) else {
            warn!(id, "pin toggle for a bookmark not in the list");
            return Err(StoreError::NotFound(id.to_string()));
        };

        self.store
            .set_pinned(&self.user_id, id, !bookmark.is_pinned)
            .await
            .map(|_| ())
            .map_err(|e| {
                error!(id, "Error toggling pin: {}", e);
                e
            })
    }

    /// Opens the delete confirmation for `id`. Returns `false` if unknown.
    pub fn request_delete(&mut self, id: &str) -> bool {
        match self.bookmarks.iter().find(|b| b.id == id) {
            Some(bookmark) => {
                self.dialog.open(&bookmark.id, &bookmark.title);
                true
            }
            None => false,
        }
    }

    pub fn cancel_delete(&mut self) {
        self.dialog.cancel();
    }

    /// Confirms the pending delete and sends it to the store.
    ///
    /// Returns the deleted id, or `None` if no delete was pending. On failure
    /// the record stays in the list and the error is returned.
    pub async fn confirm_delete(&mut self) -> Result<Option<String>, StoreError> {
        let Some(id) = self.dialog.confirm() else {
            return Ok(None);
        };

        match self.store.delete(&self.user_id, &id).await {
            Ok(()) => Ok(Some(id)),
            Err(e) => {
                error!(id = %id, "Error deleting bookmark: {}", e);
                Err(e)
            }
        }
    }

    pub fn dialog(&self) -> &DeleteDialog {
        &self.dialog
    }
}
