//! Add-bookmark form.
//!
//! Holds the field values, runs a debounced metadata lookup when the URL
//! changes, and writes a new record through the store on submit.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::services::bookmark_store::BookmarkStore;
use crate::services::metadata_extractor::MetadataSource;
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::{FormError, MetadataError};
use crate::types::metadata::PageMetadata;
use crate::types::settings::FormSettings;

/// Where a submission currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Idle,
    Validating,
    FetchingMetadata,
    Submitting,
}

/// Current field values, including the metadata preview.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub title: String,
    pub url: String,
    pub tags_input: String,
    pub description: String,
    pub image_url: String,
}

/// Splits comma-separated tag input, trimming each tag and dropping empties.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether `url` is worth a metadata lookup: long enough and `http(s)://`.
pub fn looks_like_url(url: &str, min_len: usize) -> bool {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    url.len() >= min_len && (lower.starts_with("http://") || lower.starts_with("https://"))
}

/// Validates form fields into an insert payload.
///
/// Title and URL are trimmed and required; the URL is otherwise kept as
/// typed. Blank description and image become `None`.
pub fn build_new_bookmark(user_id: &str, fields: &FormFields) -> Result<NewBookmark, FormError> {
    let title = fields.title.trim();
    if title.is_empty() {
        return Err(FormError::MissingTitle);
    }
    let url = fields.url.trim();
    if url.is_empty() {
        return Err(FormError::MissingUrl);
    }

    let optional = |value: &str| {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    };

    Ok(NewBookmark {
        user_id: user_id.to_string(),
        title: title.to_string(),
        url: url.to_string(),
        description: optional(&fields.description),
        image_url: optional(&fields.image_url),
        tags: parse_tags(&fields.tags_input),
        is_pinned: false,
    })
}

struct FormState {
    fields: FormFields,
    phase: FormPhase,
    /// Bumped on every URL edit and on a successful submit. Only a lookup
    /// carrying the current value may touch the fields.
    issued_seq: u64,
    lookups_in_flight: usize,
}

impl FormState {
    /// Returns to the resting phase once nothing is submitting.
    fn settle(&mut self) {
        self.phase = if self.lookups_in_flight > 0 {
            FormPhase::FetchingMetadata
        } else {
            FormPhase::Idle
        };
    }

    fn is_submitting(&self) -> bool {
        matches!(self.phase, FormPhase::Validating | FormPhase::Submitting)
    }

    fn apply_lookup(&mut self, seq: u64, result: Result<PageMetadata, MetadataError>) {
        self.lookups_in_flight = self.lookups_in_flight.saturating_sub(1);

        match result {
            Ok(metadata) if seq == self.issued_seq => {
                if self.fields.title.trim().is_empty() {
                    self.fields.title = metadata.title;
                }
                self.fields.description = metadata.description;
                self.fields.image_url = metadata.image;
            }
            Ok(_) => debug!(seq, current = self.issued_seq, "discarding stale metadata"),
            Err(e) => warn!(seq, "Metadata lookup failed: {}", e),
        }

        if !self.is_submitting() {
            self.settle();
        }
    }
}

/// The add-bookmark form for one user.
pub struct AddBookmarkForm {
    user_id: String,
    store: Arc<dyn BookmarkStore>,
    metadata: Arc<dyn MetadataSource>,
    debounce: Duration,
    min_url_len: usize,
    state: Arc<Mutex<FormState>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl AddBookmarkForm {
    pub fn new(
        user_id: impl Into<String>,
        store: Arc<dyn BookmarkStore>,
        metadata: Arc<dyn MetadataSource>,
        settings: &FormSettings,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            store,
            metadata,
            debounce: Duration::from_millis(settings.debounce_ms),
            min_url_len: settings.min_url_len,
            state: Arc::new(Mutex::new(FormState {
                fields: FormFields::default(),
                phase: FormPhase::Idle,
                issued_seq: 0,
                lookups_in_flight: 0,
            })),
            pending: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FormState> {
        lock_state(&self.state)
    }

    pub fn fields(&self) -> FormFields {
        self.lock().fields.clone()
    }

    pub fn phase(&self) -> FormPhase {
        self.lock().phase
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.lock().fields.title = title.into();
    }

    pub fn set_tags_input(&self, tags: impl Into<String>) {
        self.lock().fields.tags_input = tags.into();
    }

    /// Updates the URL and re-arms the debounced lookup.
    ///
    /// Any lookup still waiting out its quiet period is cancelled. Lookups
    /// already sent keep running, but every edit moves the sequence on, so
    /// their results are dropped unless no edit happened since they fired.
    pub fn set_url(&self, url: impl Into<String>) {
        let url = url.into();
        self.cancel_pending();

        let target = url.trim().to_string();
        let armed = looks_like_url(&target, self.min_url_len);

        let seq = {
            let mut state = self.lock();
            state.fields.url = url;
            state.issued_seq += 1;
            if !armed {
                return;
            }
            state.issued_seq
        };

        let state = Arc::clone(&self.state);
        let source = Arc::clone(&self.metadata);
        let delay = self.debounce;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut guard = lock_state(&state);
                guard.lookups_in_flight += 1;
                if !guard.is_submitting() {
                    guard.phase = FormPhase::FetchingMetadata;
                }
            }
            debug!(seq, url = %target, "metadata lookup fired");

            // Detached so a later keystroke cancels only the timer, not the request.
            tokio::spawn(async move {
                let result = source.lookup(&target).await;
                lock_state(&state).apply_lookup(seq, result);
            });
        });

        *self
            .pending
            .lock()
            .unwrap_or_else(|p| p.into_inner()) = Some(timer);
    }

    fn cancel_pending(&self) {
        if let Some(handle) = self
            .pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
        {
            handle.abort();
        }
    }

    /// Validates and writes the bookmark.
    ///
    /// On success every field is cleared and outstanding lookups are
    /// invalidated. On failure the input is left as it was for a retry.
    pub async fn submit(&self) -> Result<Bookmark, FormError> {
        let new = {
            let mut state = self.lock();
            if state.is_submitting() {
                return Err(FormError::Busy);
            }
            state.phase = FormPhase::Validating;
            match build_new_bookmark(&self.user_id, &state.fields) {
                Ok(new) => {
                    state.phase = FormPhase::Submitting;
                    new
                }
                Err(e) => {
                    state.settle();
                    return Err(e);
                }
            }
        };

        let result = self.store.insert(new).await;

        match result {
            Ok(bookmark) => {
                self.cancel_pending();
                let mut state = self.lock();
                state.fields = FormFields::default();
                state.issued_seq += 1;
                state.settle();
                Ok(bookmark)
            }
            Err(e) => {
                error!("Error: {}", e);
                self.lock().settle();
                Err(FormError::Store(e))
            }
        }
    }
}

impl Drop for AddBookmarkForm {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

fn lock_state(state: &Mutex<FormState>) -> MutexGuard<'_, FormState> {
    state.lock().unwrap_or_else(|p| p.into_inner())
}
