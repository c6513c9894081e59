//! Integration tests for the persistence store.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use forum_leaderboard::db::{get_post_by_permalink, Database, PostRecord, PostUpsert};
use forum_leaderboard::scoring::{score_posts, ScoredPost};
use forum_leaderboard::source::RawPost;
use forum_leaderboard::store::{PostBackend, SqlitePostBackend, Store, StoreError};
use tempfile::TempDir;

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

fn scored(permalink: &str, ups: i64, num_comments: i64) -> ScoredPost {
    ScoredPost {
        post: RawPost {
            title: format!("Post {permalink}"),
            url: format!("{permalink}/link"),
            permalink: permalink.to_string(),
            ups,
            num_comments,
            created_utc: Some(1_700_000_000.0),
        },
        engagement: ups + num_comments,
    }
}

fn forums(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn test_upsert_same_identity_keeps_first_seen() {
    let (db, _temp_dir) = setup_db().await;
    let store = Store::from_database(db.clone());

    let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let t2 = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();

    store
        .upsert_at("n8n", &[scored("https://x/p1", 10, 2)], t1)
        .await
        .unwrap();
    let first = get_post_by_permalink(db.pool(), "https://x/p1")
        .await
        .unwrap()
        .expect("post stored");

    store
        .upsert_at("n8n", &[scored("https://x/p1", 20, 2)], t2)
        .await
        .unwrap();

    let leaderboard = store.query_latest(&forums(&["n8n"]), 10).await;
    let posts = &leaderboard["n8n"];
    assert_eq!(posts.len(), 1);

    let post = &posts[0];
    assert_eq!(post.ups, 20);
    assert_eq!(post.engagement, 22);
    assert_eq!(post.first_seen_at, first.first_seen_at);
    assert_eq!(post.first_seen_at, first.last_seen_at);
    assert_ne!(post.last_seen_at, first.last_seen_at);
    assert!(post.last_seen_at.starts_with("2024-01-02T12:00:00"));
}

#[tokio::test]
async fn test_upsert_moves_post_between_forums() {
    let (db, _temp_dir) = setup_db().await;
    let store = Store::from_database(db);

    store.upsert("n8n", &[scored("https://x/p1", 1, 1)]).await.unwrap();
    store
        .upsert("automation", &[scored("https://x/p1", 1, 1)])
        .await
        .unwrap();

    let leaderboard = store.query_latest(&forums(&["n8n", "automation"]), 10).await;
    assert!(leaderboard["n8n"].is_empty());
    assert_eq!(leaderboard["automation"].len(), 1);
    assert_eq!(leaderboard["automation"][0].forum, "automation");
}

#[tokio::test]
async fn test_distinct_identities_ordered_by_score() {
    let (db, _temp_dir) = setup_db().await;
    let store = Store::from_database(db);

    let report = store
        .upsert(
            "n8n",
            &[
                scored("https://x/low", 1, 0),
                scored("https://x/high", 50, 10),
                scored("https://x/mid", 5, 5),
            ],
        )
        .await
        .unwrap();
    assert_eq!(report.upserted, 3);
    assert_eq!(report.failed, 0);

    let leaderboard = store.query_latest(&forums(&["n8n"]), 10).await;
    let order: Vec<&str> = leaderboard["n8n"]
        .iter()
        .map(|p| p.permalink.as_str())
        .collect();
    assert_eq!(order, vec!["https://x/high", "https://x/mid", "https://x/low"]);

    let top_two = store.query_latest(&forums(&["n8n"]), 2).await;
    assert_eq!(top_two["n8n"].len(), 2);
}

#[tokio::test]
async fn test_query_returns_entry_per_forum() {
    let (db, _temp_dir) = setup_db().await;
    let store = Store::from_database(db);

    store.upsert("n8n", &[scored("https://x/a", 1, 0)]).await.unwrap();

    let leaderboard = store.query_latest(&forums(&["n8n", "empty"]), 5).await;
    assert_eq!(leaderboard.len(), 2);
    assert!(leaderboard["empty"].is_empty());
}

#[tokio::test]
async fn test_records_hide_row_id() {
    let (db, _temp_dir) = setup_db().await;
    let store = Store::from_database(db);
    store.upsert("n8n", &[scored("https://x/a", 1, 0)]).await.unwrap();

    let leaderboard = store.query_latest(&forums(&["n8n"]), 5).await;
    let json = serde_json::to_value(&leaderboard).unwrap();
    let record = &json["n8n"][0];
    assert!(record.get("id").is_none());
    assert!(record.get("_id").is_none());
    assert_eq!(record["permalink"], "https://x/a");
    assert!(record.get("first_seen_at").is_some());
}

#[tokio::test]
async fn test_scored_pipeline_output_round_trips_through_store() {
    let (db, _temp_dir) = setup_db().await;
    let store = Store::from_database(db);

    let raw = vec![
        scored("https://x/a", 10, 5).post,
        scored("https://x/b", 1, 1).post,
        scored("https://x/c", 7, 8).post,
    ];
    let top = score_posts(raw, 2);
    store.upsert("n8n", &top).await.unwrap();

    let leaderboard = store.query_latest(&forums(&["n8n"]), 5).await;
    let order: Vec<&str> = leaderboard["n8n"]
        .iter()
        .map(|p| p.permalink.as_str())
        .collect();
    assert_eq!(order, vec!["https://x/a", "https://x/c"]);
}

#[tokio::test]
async fn test_disconnected_store_is_a_no_op() {
    let store = Store::disconnected();
    assert!(!store.is_connected());

    let err = store
        .upsert("n8n", &[scored("https://x/p1", 1, 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Disconnected));

    assert!(store.query_latest(&forums(&["n8n"]), 5).await.is_empty());
    assert_eq!(store.count_posts("n8n").await, None);
}

#[tokio::test]
async fn test_connect_without_url_is_disconnected() {
    let store = Store::connect(None).await;
    assert!(!store.is_connected());
}

#[tokio::test]
async fn test_connect_with_url_creates_database() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("leaderboard.sqlite");
    let url = format!("sqlite://{}", db_path.display());

    let store = Store::connect(Some(url.as_str())).await;
    assert!(store.is_connected());
    assert!(db_path.exists());

    store.upsert("n8n", &[scored("https://x/a", 1, 0)]).await.unwrap();
    assert_eq!(store.count_posts("n8n").await, Some(1));
}

#[tokio::test]
async fn test_connect_failure_is_disconnected() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let url = format!("sqlite://{}", blocker.join("db.sqlite").display());

    let store = Store::connect(Some(url.as_str())).await;
    assert!(!store.is_connected());
}

/// Backend that rejects one permalink and stores everything else in SQLite.
struct FlakyBackend {
    inner: SqlitePostBackend,
    reject: &'static str,
}

#[async_trait]
impl PostBackend for FlakyBackend {
    async fn upsert_post(&self, post: &PostUpsert<'_>) -> Result<()> {
        if post.permalink == self.reject {
            anyhow::bail!("simulated write failure");
        }
        self.inner.upsert_post(post).await
    }

    async fn top_posts(&self, forum: &str, limit: usize) -> Result<Vec<PostRecord>> {
        self.inner.top_posts(forum, limit).await
    }

    async fn count_posts(&self, forum: &str) -> Result<i64> {
        self.inner.count_posts(forum).await
    }
}

#[tokio::test]
async fn test_partial_batch_failure_continues() {
    let (db, _temp_dir) = setup_db().await;
    let store = Store::with_backend(Arc::new(FlakyBackend {
        inner: SqlitePostBackend::new(db),
        reject: "https://x/bad",
    }));

    let report = store
        .upsert(
            "n8n",
            &[
                scored("https://x/ok1", 3, 0),
                scored("https://x/bad", 9, 9),
                scored("https://x/ok2", 2, 0),
            ],
        )
        .await
        .unwrap();

    assert_eq!(report.upserted, 2);
    assert_eq!(report.failed, 1);

    let leaderboard = store.query_latest(&forums(&["n8n"]), 10).await;
    let stored: Vec<&str> = leaderboard["n8n"]
        .iter()
        .map(|p| p.permalink.as_str())
        .collect();
    assert_eq!(stored, vec!["https://x/ok1", "https://x/ok2"]);
}

#[tokio::test]
async fn test_connected_follows_backend() {
    let (db, _temp_dir) = setup_db().await;
    let store = Store::with_backend(Arc::new(SqlitePostBackend::new(db)));
    assert!(store.is_connected());
    assert!(store.clone().is_connected());
    assert!(format!("{store:?}").contains("connected: true"));

    let store = Store::disconnected();
    assert!(!store.clone().is_connected());
    assert!(format!("{store:?}").contains("connected: false"));
}
