//! Unit tests for the SQLite bookmark store and its change feed.

use std::sync::Arc;

use remarkable::database::Database;
use remarkable::services::bookmark_store::{BookmarkStore, SqliteBookmarkStore};
use remarkable::types::bookmark::{ChangeEvent, NewBookmark};
use remarkable::types::errors::StoreError;

const ALICE: &str = "user-alice";
const BOB: &str = "user-bob";

fn store() -> SqliteBookmarkStore {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    SqliteBookmarkStore::new(Arc::new(db))
}

fn new_bookmark(user_id: &str, title: &str, url: &str) -> NewBookmark {
    NewBookmark {
        user_id: user_id.to_string(),
        title: title.to_string(),
        url: url.to_string(),
        description: None,
        image_url: None,
        tags: Vec::new(),
        is_pinned: false,
    }
}

#[tokio::test]
async fn test_insert_assigns_id_and_timestamp() {
    let store = store();
    let bookmark = store
        .insert(NewBookmark {
            description: Some("The book".to_string()),
            image_url: Some("https://example.com/c.png".to_string()),
            tags: vec!["rust".to_string(), "docs".to_string()],
            ..new_bookmark(ALICE, "Rust Book", "https://doc.rust-lang.org/book")
        })
        .await
        .unwrap();

    assert!(!bookmark.id.is_empty());
    assert!(!bookmark.is_pinned);

    let stored = store.get(ALICE, &bookmark.id).unwrap().unwrap();
    assert_eq!(stored, bookmark);
    assert_eq!(stored.tags, vec!["rust", "docs"]);
}

#[tokio::test]
async fn test_url_is_stored_verbatim() {
    let store = store();
    let bookmark = store
        .insert(new_bookmark(ALICE, "Example", "example.com"))
        .await
        .unwrap();
    assert_eq!(bookmark.url, "example.com");
    assert_eq!(store.list_for_user(ALICE).await.unwrap()[0].url, "example.com");
}

#[tokio::test]
async fn test_insert_rejects_missing_fields() {
    let store = store();
    let result = store.insert(new_bookmark(ALICE, "  ", "https://x.io")).await;
    assert!(matches!(result, Err(StoreError::Invalid(_))));

    let result = store.insert(new_bookmark("", "Title", "https://x.io")).await;
    assert!(matches!(result, Err(StoreError::Invalid(_))));
}

#[tokio::test]
async fn test_rapid_inserts_get_increasing_timestamps() {
    let store = store();
    let mut previous = None;
    for i in 0..20 {
        let b = store
            .insert(new_bookmark(ALICE, &format!("B{i}"), "https://x.io"))
            .await
            .unwrap();
        if let Some(prev) = previous {
            assert!(b.created_at > prev);
        }
        previous = Some(b.created_at);
    }
}

#[tokio::test]
async fn test_list_orders_pinned_then_newest() {
    let store = store();
    let old = store.insert(new_bookmark(ALICE, "Old", "https://a.io")).await.unwrap();
    let mid = store.insert(new_bookmark(ALICE, "Mid", "https://b.io")).await.unwrap();
    let new = store.insert(new_bookmark(ALICE, "New", "https://c.io")).await.unwrap();
    store.set_pinned(ALICE, &old.id, true).await.unwrap();

    let ids: Vec<String> = store
        .list_for_user(ALICE)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(ids, vec![old.id, new.id, mid.id]);
}

#[tokio::test]
async fn test_records_are_scoped_to_owner() {
    let store = store();
    let alice = store.insert(new_bookmark(ALICE, "Mine", "https://a.io")).await.unwrap();
    store.insert(new_bookmark(BOB, "Bob's", "https://b.io")).await.unwrap();

    assert_eq!(store.list_for_user(ALICE).await.unwrap().len(), 1);
    assert!(store.get(BOB, &alice.id).unwrap().is_none());

    let pin = store.set_pinned(BOB, &alice.id, true).await;
    assert!(matches!(pin, Err(StoreError::NotFound(_))));

    let delete = store.delete(BOB, &alice.id).await;
    assert!(matches!(delete, Err(StoreError::NotFound(_))));
    assert!(store.get(ALICE, &alice.id).unwrap().is_some());
}

#[tokio::test]
async fn test_feed_delivers_writes_in_order() {
    let store = store();
    let mut changes = store.subscribe(ALICE);

    let b = store.insert(new_bookmark(ALICE, "Feed", "https://f.io")).await.unwrap();
    store.set_pinned(ALICE, &b.id, true).await.unwrap();
    store.delete(ALICE, &b.id).await.unwrap();

    match changes.try_next() {
        Some(ChangeEvent::Insert { new }) => assert_eq!(new.id, b.id),
        other => panic!("expected insert, got {other:?}"),
    }
    match changes.try_next() {
        Some(ChangeEvent::Update { old, new }) => {
            assert!(!old.unwrap().is_pinned);
            assert!(new.is_pinned);
        }
        other => panic!("expected update, got {other:?}"),
    }
    assert_eq!(changes.try_next(), Some(ChangeEvent::Delete { id: b.id.clone() }));
    assert_eq!(changes.try_next(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pins_publish_in_commit_order() {
    let store = Arc::new(store());
    let b = store.insert(new_bookmark(ALICE, "Raced", "https://r.io")).await.unwrap();
    let mut changes = store.subscribe(ALICE);

    let mut tasks = Vec::new();
    for worker in 0..4 {
        let store = store.clone();
        let id = b.id.clone();
        tasks.push(tokio::spawn(async move {
            for round in 0..40 {
                let pinned = (worker + round) % 2 == 0;
                store.set_pinned(ALICE, &id, pinned).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // Each update's `old` must be the previous update's `new`.
    let mut last = false;
    let mut seen = 0;
    while let Some(event) = changes.try_next() {
        match event {
            ChangeEvent::Update { old, new } => {
                assert_eq!(old.unwrap().is_pinned, last);
                last = new.is_pinned;
                seen += 1;
            }
            other => panic!("expected update, got {other:?}"),
        }
    }
    assert_eq!(seen, 160);
    assert_eq!(store.get(ALICE, &b.id).unwrap().unwrap().is_pinned, last);
}

#[tokio::test]
async fn test_feed_filters_other_users() {
    let store = store();
    let mut alice = store.subscribe(ALICE);

    store.insert(new_bookmark(BOB, "Bob's", "https://b.io")).await.unwrap();
    assert_eq!(alice.try_next(), None);
}

#[tokio::test]
async fn test_failed_write_publishes_nothing() {
    let store = store();
    let mut changes = store.subscribe(ALICE);

    let _ = store.delete(ALICE, "missing").await;
    let _ = store.insert(new_bookmark(ALICE, "", "https://x.io")).await;
    assert_eq!(changes.try_next(), None);
}

#[tokio::test]
async fn test_dropping_subscription_unsubscribes() {
    let store = store();
    let changes = store.subscribe(ALICE);
    assert_eq!(store.feed().subscriber_count(), 1);
    drop(changes);
    assert_eq!(store.feed().subscriber_count(), 0);
}
