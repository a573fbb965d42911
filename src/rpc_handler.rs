//! RPC method handler for the ReMarkable JSON-lines protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested independently.
//! An [`RpcSession`] owns the session state plus the signed-in user's add
//! form and list view, and `handle_method` drives those view models the way
//! a GUI shell would: form edits, submit, list folding, pin toggles and the
//! two-step delete.

use serde_json::{json, Value};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::debug;

use crate::app::App;
use crate::managers::bookmark_form::{parse_tags, AddBookmarkForm, FormPhase};
use crate::managers::bookmark_list::{link_target, BookmarkListView};
use crate::managers::session_manager::SessionManager;
use crate::services::auth_service::AuthProvider;
use crate::services::metadata_extractor::MetadataSource;
use crate::types::bookmark::Bookmark;
use crate::types::errors::{AuthError, StoreError};

/// View models mounted for one signed-in user.
struct UserViews {
    user_id: String,
    form: AddBookmarkForm,
    list: BookmarkListView,
}

/// State shared by every request on one RPC connection.
pub struct RpcSession {
    app: App,
    session: SessionManager,
    views: Mutex<Option<UserViews>>,
}

impl RpcSession {
    /// Starts following the session. Views are mounted on first use.
    pub async fn start(app: App) -> Result<Self, AuthError> {
        let session = app.session_manager().await?;
        Ok(Self {
            app,
            session,
            views: Mutex::new(None),
        })
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    /// The current user's views, mounting fresh ones when the user changed.
    async fn views(&self) -> Result<MappedMutexGuard<'_, UserViews>, String> {
        let user = self
            .session
            .current_user()
            .ok_or_else(|| "not signed in".to_string())?;

        let mut slot = self.views.lock().await;
        if slot.as_ref().map_or(true, |views| views.user_id != user.id) {
            debug!(user_id = %user.id, "mounting views");
            let list = self.app.list_view(&user.id).await;
            let form = self.app.add_form(&user.id);
            *slot = Some(UserViews {
                user_id: user.id,
                form,
                list,
            });
        }
        MutexGuard::try_map(slot, Option::as_mut).map_err(|_| "not signed in".to_string())
    }

    async fn drop_views(&self) {
        *self.views.lock().await = None;
    }
}

fn str_param<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

fn bookmark_json(b: &Bookmark) -> Value {
    json!({
        "id": b.id,
        "title": b.title,
        "url": b.url,
        "link": link_target(&b.url),
        "description": b.description,
        "image_url": b.image_url,
        "tags": b.tags,
        "is_pinned": b.is_pinned,
        "created_at": b.created_at.timestamp_millis(),
    })
}

fn phase_name(phase: FormPhase) -> &'static str {
    match phase {
        FormPhase::Idle => "idle",
        FormPhase::Validating => "validating",
        FormPhase::FetchingMetadata => "fetching_metadata",
        FormPhase::Submitting => "submitting",
    }
}

fn form_json(form: &AddBookmarkForm) -> Value {
    let fields = form.fields();
    json!({
        "title": fields.title,
        "url": fields.url,
        "tags": fields.tags_input,
        "description": fields.description,
        "image_url": fields.image_url,
        "phase": phase_name(form.phase()),
    })
}

fn id_param(params: &Value) -> Result<&str, String> {
    str_param(params, "id").ok_or_else(|| "missing id".to_string())
}

/// Dispatch an RPC method call.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(rpc: &RpcSession, method: &str, params: &Value) -> Result<Value, String> {
    let app = rpc.app();
    match method {
        "ping" => Ok(json!({"pong": true, "version": env!("CARGO_PKG_VERSION")})),

        // ─── Auth ───
        "auth.session" => Ok(match rpc.session.current_session() {
            Some(s) => json!({
                "user_id": s.user.id,
                "email": s.user.email,
                "display_name": s.user.display_name(),
                "provider": s.user.provider,
            }),
            None => Value::Null,
        }),
        "auth.sign_in" => {
            let provider = str_param(params, "provider").ok_or("missing provider")?;
            let email = str_param(params, "email").ok_or("missing email")?;
            let session = app
                .auth
                .sign_in_with_provider(provider, email)
                .await
                .map_err(|e| e.to_string())?;
            rpc.session.set_current(Some(session.clone()));
            rpc.drop_views().await;
            Ok(json!({"user_id": session.user.id, "email": session.user.email}))
        }
        "auth.sign_out" => {
            app.auth.sign_out().await.map_err(|e| e.to_string())?;
            rpc.session.set_current(None);
            rpc.drop_views().await;
            Ok(json!({"ok": true}))
        }

        // ─── Metadata ───
        "metadata.fetch" => {
            let url = str_param(params, "url").unwrap_or("").trim();
            if url.is_empty() {
                return Err("URL is required".to_string());
            }
            let metadata = app.form_lookup.lookup(url).await.map_err(|e| e.to_string())?;
            serde_json::to_value(metadata).map_err(|e| e.to_string())
        }

        // ─── Add form ───
        "form.state" => Ok(form_json(&rpc.views().await?.form)),
        "form.set_title" => {
            let views = rpc.views().await?;
            views.form.set_title(str_param(params, "title").unwrap_or(""));
            Ok(form_json(&views.form))
        }
        "form.set_url" => {
            let views = rpc.views().await?;
            views.form.set_url(str_param(params, "url").unwrap_or(""));
            Ok(form_json(&views.form))
        }
        "form.set_tags" => {
            let views = rpc.views().await?;
            views.form.set_tags_input(str_param(params, "tags").unwrap_or(""));
            Ok(form_json(&views.form))
        }
        "form.submit" => {
            let mut views = rpc.views().await?;
            let bookmark = views.form.submit().await.map_err(|e| e.to_string())?;
            views.list.drain_changes();
            Ok(bookmark_json(&bookmark))
        }
        // One-shot add: fills the form and submits it.
        "bookmark.add" => {
            let mut views = rpc.views().await?;
            views.form.set_title(str_param(params, "title").unwrap_or(""));
            views.form.set_url(str_param(params, "url").unwrap_or(""));
            views.form.set_tags_input(str_param(params, "tags").unwrap_or(""));
            let bookmark = views.form.submit().await.map_err(|e| e.to_string())?;
            views.list.drain_changes();
            Ok(bookmark_json(&bookmark))
        }

        // ─── List ───
        "bookmark.list" => {
            let mut views = rpc.views().await?;
            views.list.drain_changes();
            views.list.set_search_term(str_param(params, "query").unwrap_or(""));
            let arr: Vec<Value> = views.list.visible().into_iter().map(bookmark_json).collect();
            Ok(json!(arr))
        }
        "bookmark.pin" => {
            let id = id_param(params)?;
            let mut views = rpc.views().await?;
            views.list.drain_changes();
            views.list.toggle_pin(id).await.map_err(|e| e.to_string())?;
            views.list.drain_changes();
            views
                .list
                .bookmarks()
                .iter()
                .find(|b| b.id == id)
                .map(bookmark_json)
                .ok_or_else(|| StoreError::NotFound(id.to_string()).to_string())
        }
        "bookmark.request_delete" => {
            let id = id_param(params)?;
            let mut views = rpc.views().await?;
            views.list.drain_changes();
            if !views.list.request_delete(id) {
                return Err(StoreError::NotFound(id.to_string()).to_string());
            }
            Ok(json!({"prompt": views.list.dialog().prompt()}))
        }
        "bookmark.cancel_delete" => {
            let mut views = rpc.views().await?;
            views.list.cancel_delete();
            Ok(json!({"ok": true}))
        }
        "bookmark.confirm_delete" => {
            let mut views = rpc.views().await?;
            let deleted = views.list.confirm_delete().await.map_err(|e| e.to_string())?;
            views.list.drain_changes();
            Ok(json!({"deleted": deleted}))
        }

        "tags.parse" => {
            let input = str_param(params, "input").unwrap_or("");
            Ok(json!(parse_tags(input)))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
