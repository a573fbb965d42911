//! Unit tests for the RPC handler: every method dispatched by `handle_method`.
//!
//! Each test runs against a fresh session on a temporary on-disk database,
//! the same path the `remarkable-rpc` binary takes.

use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use remarkable::app::App;
use remarkable::rpc_handler::{handle_method, RpcSession};
use remarkable::services::bookmark_store::BookmarkStore;
use remarkable::types::bookmark::NewBookmark;
use remarkable::types::settings::AppSettings;

/// Create a fresh session backed by a temp directory DB.
async fn setup() -> (RpcSession, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let mut settings = AppSettings::default();
    settings.storage.database_path = Some(tmp.path().join("test.db").to_string_lossy().to_string());
    settings.form.debounce_ms = 50;
    let app = App::new(settings).expect("Failed to init App");
    let rpc = RpcSession::start(app).await.expect("Failed to start session");
    (rpc, tmp)
}

async fn signed_in() -> (RpcSession, TempDir) {
    let (rpc, tmp) = setup().await;
    handle_method(&rpc, "auth.sign_in", &json!({"provider": "email", "email": "ada@example.com"}))
        .await
        .unwrap();
    (rpc, tmp)
}

async fn call(rpc: &RpcSession, method: &str, params: Value) -> Value {
    handle_method(rpc, method, &params).await.unwrap()
}

/// Polls `form.state` until `check` passes or two seconds have gone by.
async fn form_until(rpc: &RpcSession, check: impl Fn(&Value) -> bool) -> Value {
    for _ in 0..100 {
        let state = call(rpc, "form.state", json!({})).await;
        if check(&state) {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    call(rpc, "form.state", json!({})).await
}

// ─── Ping ───

#[tokio::test]
async fn test_ping() {
    let (rpc, _tmp) = setup().await;
    let res = call(&rpc, "ping", json!({})).await;
    assert_eq!(res["pong"], true);
}

#[tokio::test]
async fn test_unknown_method_returns_error() {
    let (rpc, _tmp) = setup().await;
    let res = handle_method(&rpc, "nonexistent.method", &json!({})).await;
    assert!(res.unwrap_err().contains("unknown method"));
}

// ─── Auth ───

#[tokio::test]
async fn test_auth_session_lifecycle() {
    let (rpc, _tmp) = setup().await;
    assert_eq!(call(&rpc, "auth.session", json!({})).await, Value::Null);

    let signed = call(
        &rpc,
        "auth.sign_in",
        json!({"provider": "github", "email": "ada@example.com"}),
    )
    .await;
    let session = call(&rpc, "auth.session", json!({})).await;
    assert_eq!(session["user_id"], signed["user_id"]);
    assert_eq!(session["display_name"], "ada");

    call(&rpc, "auth.sign_out", json!({})).await;
    assert_eq!(call(&rpc, "auth.session", json!({})).await, Value::Null);
}

#[tokio::test]
async fn test_bookmark_methods_require_session() {
    let (rpc, _tmp) = setup().await;
    let res = handle_method(&rpc, "bookmark.list", &json!({})).await;
    assert_eq!(res.unwrap_err(), "not signed in");
}

// ─── Bookmarks ───

#[tokio::test]
async fn test_bookmark_add_and_list() {
    let (rpc, _tmp) = signed_in().await;

    let added = call(
        &rpc,
        "bookmark.add",
        json!({"title": "Example", "url": "example.com", "tags": "tech, work, , design"}),
    )
    .await;
    assert_eq!(added["url"], "example.com");
    assert_eq!(added["link"], "https://example.com");
    assert_eq!(added["tags"], json!(["tech", "work", "design"]));
    assert_eq!(added["is_pinned"], false);
    assert_eq!(added["description"], Value::Null);

    let list = call(&rpc, "bookmark.list", json!({})).await;
    let arr = list.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["id"], added["id"]);
}

#[tokio::test]
async fn test_bookmark_add_validates() {
    let (rpc, _tmp) = signed_in().await;
    let res = handle_method(&rpc, "bookmark.add", &json!({"url": "https://x.io"})).await;
    assert_eq!(res.unwrap_err(), "Title is required");

    let res = handle_method(&rpc, "bookmark.add", &json!({"title": "X"})).await;
    assert_eq!(res.unwrap_err(), "URL is required");
}

#[tokio::test]
async fn test_bookmark_list_query_filters() {
    let (rpc, _tmp) = signed_in().await;
    call(&rpc, "bookmark.add", json!({"title": "Rust Book", "url": "https://doc.rust-lang.org"})).await;
    call(&rpc, "bookmark.add", json!({"title": "News", "url": "https://news.ycombinator.com"})).await;

    let list = call(&rpc, "bookmark.list", json!({"query": "rust"})).await;
    let arr = list.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["title"], "Rust Book");
}

#[tokio::test]
async fn test_bookmark_pin_toggles_and_reorders() {
    let (rpc, _tmp) = signed_in().await;
    let older = call(&rpc, "bookmark.add", json!({"title": "Older", "url": "https://o.io"})).await;
    call(&rpc, "bookmark.add", json!({"title": "Newer", "url": "https://n.io"})).await;

    let pinned = call(&rpc, "bookmark.pin", json!({"id": older["id"]})).await;
    assert_eq!(pinned["is_pinned"], true);

    let list = call(&rpc, "bookmark.list", json!({})).await;
    assert_eq!(list[0]["title"], "Older");

    let unpinned = call(&rpc, "bookmark.pin", json!({"id": older["id"]})).await;
    assert_eq!(unpinned["is_pinned"], false);
    let list = call(&rpc, "bookmark.list", json!({})).await;
    assert_eq!(list[0]["title"], "Newer");
}

#[tokio::test]
async fn test_bookmark_pin_unknown_id() {
    let (rpc, _tmp) = signed_in().await;
    let res = handle_method(&rpc, "bookmark.pin", &json!({"id": "missing"})).await;
    assert!(res.unwrap_err().contains("not found"));
}

#[tokio::test]
async fn test_delete_goes_through_confirmation() {
    let (rpc, _tmp) = signed_in().await;
    let added = call(&rpc, "bookmark.add", json!({"title": "Gone", "url": "https://g.io"})).await;

    let res = call(&rpc, "bookmark.request_delete", json!({"id": added["id"]})).await;
    assert_eq!(
        res["prompt"],
        "Are you sure you want to delete \"Gone\"? This action cannot be undone."
    );
    assert_eq!(call(&rpc, "bookmark.list", json!({})).await.as_array().unwrap().len(), 1);

    call(&rpc, "bookmark.cancel_delete", json!({})).await;
    let res = call(&rpc, "bookmark.confirm_delete", json!({})).await;
    assert_eq!(res, json!({"deleted": null}));
    assert_eq!(call(&rpc, "bookmark.list", json!({})).await.as_array().unwrap().len(), 1);

    call(&rpc, "bookmark.request_delete", json!({"id": added["id"]})).await;
    let res = call(&rpc, "bookmark.confirm_delete", json!({})).await;
    assert_eq!(res, json!({"deleted": added["id"]}));
    assert_eq!(call(&rpc, "bookmark.list", json!({})).await, json!([]));

    let res = handle_method(&rpc, "bookmark.request_delete", &json!({"id": added["id"]})).await;
    assert!(res.unwrap_err().contains("not found"));
}

#[tokio::test]
async fn test_list_follows_writes_from_elsewhere() {
    let (rpc, _tmp) = signed_in().await;
    assert_eq!(call(&rpc, "bookmark.list", json!({})).await, json!([]));

    let user_id = call(&rpc, "auth.session", json!({})).await["user_id"]
        .as_str()
        .unwrap()
        .to_string();
    rpc.app()
        .store
        .insert(NewBookmark {
            user_id,
            title: "From another device".to_string(),
            url: "https://elsewhere.io".to_string(),
            description: None,
            image_url: None,
            tags: vec!["sync".to_string()],
            is_pinned: true,
        })
        .await
        .unwrap();

    let list = call(&rpc, "bookmark.list", json!({})).await;
    assert_eq!(list[0]["title"], "From another device");
    assert_eq!(list[0]["is_pinned"], true);
}

#[tokio::test]
async fn test_records_are_per_user() {
    let (rpc, _tmp) = signed_in().await;
    call(&rpc, "bookmark.add", json!({"title": "Ada's", "url": "https://a.io"})).await;

    call(&rpc, "auth.sign_in", json!({"provider": "email", "email": "bob@example.com"})).await;
    assert_eq!(call(&rpc, "bookmark.list", json!({})).await, json!([]));
}

// ─── Add form ───

#[tokio::test]
async fn test_form_requires_session() {
    let (rpc, _tmp) = setup().await;
    let res = handle_method(&rpc, "form.set_url", &json!({"url": "https://x.io"})).await;
    assert_eq!(res.unwrap_err(), "not signed in");
}

#[tokio::test]
async fn test_form_lookup_fill_and_submit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<meta property="og:title" content="Deep Dive"><meta name="description" content="All about it">"#,
        ))
        .mount(&server)
        .await;

    let (rpc, _tmp) = signed_in().await;
    let url = format!("{}/article", server.uri());
    let state = call(&rpc, "form.set_url", json!({"url": url})).await;
    assert_eq!(state["url"], url);
    assert_eq!(state["title"], "");

    let state = form_until(&rpc, |s| s["title"] == "Deep Dive" && s["phase"] == "idle").await;
    assert_eq!(state["title"], "Deep Dive");
    assert_eq!(state["description"], "All about it");

    call(&rpc, "form.set_tags", json!({"tags": "reading, , long"})).await;
    let saved = call(&rpc, "form.submit", json!({})).await;
    assert_eq!(saved["title"], "Deep Dive");
    assert_eq!(saved["description"], "All about it");
    assert_eq!(saved["tags"], json!(["reading", "long"]));

    let state = call(&rpc, "form.state", json!({})).await;
    assert_eq!(state["url"], "");
    assert_eq!(state["title"], "");
    assert_eq!(state["phase"], "idle");

    let list = call(&rpc, "bookmark.list", json!({})).await;
    assert_eq!(list[0]["id"], saved["id"]);
}

#[tokio::test]
async fn test_form_keeps_input_on_validation_error() {
    let (rpc, _tmp) = signed_in().await;
    call(&rpc, "form.set_title", json!({"title": "No link yet"})).await;

    let res = handle_method(&rpc, "form.submit", &json!({})).await;
    assert_eq!(res.unwrap_err(), "URL is required");
    assert_eq!(call(&rpc, "form.state", json!({})).await["title"], "No link yet");
}

#[tokio::test]
async fn test_sign_out_discards_form() {
    let (rpc, _tmp) = signed_in().await;
    call(&rpc, "form.set_title", json!({"title": "Draft"})).await;

    call(&rpc, "auth.sign_out", json!({})).await;
    call(&rpc, "auth.sign_in", json!({"provider": "email", "email": "ada@example.com"})).await;

    assert_eq!(call(&rpc, "form.state", json!({})).await["title"], "");
}

// ─── Tags / metadata ───

#[tokio::test]
async fn test_tags_parse() {
    let (rpc, _tmp) = setup().await;
    let res = call(&rpc, "tags.parse", json!({"input": "tech, work, , design"})).await;
    assert_eq!(res, json!(["tech", "work", "design"]));
}

#[tokio::test]
async fn test_metadata_fetch_requires_url() {
    let (rpc, _tmp) = setup().await;
    let res = handle_method(&rpc, "metadata.fetch", &json!({"url": "  "})).await;
    assert_eq!(res.unwrap_err(), "URL is required");
}

#[tokio::test]
async fn test_metadata_fetch_extracts_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<meta property="og:title" content="A"><title>B</title><meta property="og:image" content="/x.png">"#,
        ))
        .mount(&server)
        .await;

    let (rpc, _tmp) = setup().await;
    let res = call(&rpc, "metadata.fetch", json!({"url": format!("{}/page", server.uri())})).await;
    assert_eq!(res["title"], "A");
    assert_eq!(res["image"], format!("{}/x.png", server.uri()));
}
