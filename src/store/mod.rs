//! Persistence store for scored posts.
//!
//! The store wraps an optional [`PostBackend`]. When the backend could not be
//! reached at startup the store stays disconnected for the life of the
//! process: upserts report [`StoreError::Disconnected`] and queries return an
//! empty leaderboard.

mod sqlite;

pub use sqlite::SqlitePostBackend;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{Database, PostRecord, PostUpsert};
use crate::scoring::ScoredPost;

/// Leaderboard: forum name to its stored posts, most engaging first.
pub type Leaderboard = BTreeMap<String, Vec<PostRecord>>;

/// Storage capability required by the store: atomic upsert keyed by permalink.
#[async_trait]
pub trait PostBackend: Send + Sync {
    /// Insert or update one post. Must be atomic per permalink and must never
    /// modify `first_seen_at` of an existing record.
    async fn upsert_post(&self, post: &PostUpsert<'_>) -> Result<()>;

    /// Up to `limit` posts of `forum`, by engagement descending.
    async fn top_posts(&self, forum: &str, limit: usize) -> Result<Vec<PostRecord>>;

    /// Number of stored posts of `forum`.
    async fn count_posts(&self, forum: &str) -> Result<i64>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database not connected")]
    Disconnected,
}

/// Outcome of one batch upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertReport {
    pub upserted: usize,
    pub failed: usize,
}

/// Shared handle to the persistence backend.
#[derive(Clone)]
pub struct Store {
    backend: Option<Arc<dyn PostBackend>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Connect to the database named by `database_url`.
    ///
    /// Never fails: a missing URL or an unreachable database yields a
    /// disconnected store.
    pub async fn connect(database_url: Option<&str>) -> Self {
        let Some(url) = database_url else {
            warn!("DATABASE_URL not set, persistence disabled");
            return Self::disconnected();
        };

        match Database::connect(url).await {
            Ok(db) => {
                info!("Connected to database");
                Self::from_database(db)
            }
            Err(e) => {
                warn!("Failed to connect to database, persistence disabled: {e:#}");
                Self::disconnected()
            }
        }
    }

    /// A connected store over an open SQLite database.
    #[must_use]
    pub fn from_database(db: Database) -> Self {
        Self::with_backend(Arc::new(SqlitePostBackend::new(db)))
    }

    /// A connected store over any backend.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn PostBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A store that turns every operation into a no-op.
    #[must_use]
    pub fn disconnected() -> Self {
        Self {
            backend: None,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.backend.is_some()
    }

    /// Upsert a batch of scored posts, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Disconnected`] if the store has no backend.
    pub async fn upsert(
        &self,
        forum: &str,
        posts: &[ScoredPost],
    ) -> Result<UpsertReport, StoreError> {
        self.upsert_at(forum, posts, Utc::now()).await
    }

    /// Upsert a batch of scored posts as seen at `now`.
    ///
    /// Each post is written independently; a failing post is logged and
    /// skipped and the rest of the batch still goes through.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Disconnected`] if the store has no backend.
    pub async fn upsert_at(
        &self,
        forum: &str,
        posts: &[ScoredPost],
        now: DateTime<Utc>,
    ) -> Result<UpsertReport, StoreError> {
        let backend = self.backend.as_ref().ok_or(StoreError::Disconnected)?;
        let seen_at = now.to_rfc3339_opts(SecondsFormat::Micros, true);

        let mut report = UpsertReport::default();
        for scored in posts {
            let post = &scored.post;
            let upsert = PostUpsert {
                permalink: &post.permalink,
                forum,
                title: &post.title,
                url: &post.url,
                ups: post.ups,
                num_comments: post.num_comments,
                engagement: scored.engagement,
                created_utc: post.created_utc,
                seen_at: &seen_at,
            };

            match backend.upsert_post(&upsert).await {
                Ok(()) => report.upserted += 1,
                Err(e) => {
                    warn!(forum = %forum, permalink = %post.permalink, "Failed to upsert post: {e:#}");
                    report.failed += 1;
                }
            }
        }

        debug!(
            forum = %forum,
            upserted = report.upserted,
            failed = report.failed,
            "Upserted batch"
        );
        Ok(report)
    }

    /// Top `limit` stored posts for each requested forum.
    ///
    /// Every requested forum gets an entry. Disconnected stores return an
    /// empty map.
    pub async fn query_latest(&self, forums: &[String], limit: usize) -> Leaderboard {
        let Some(backend) = self.backend.as_ref() else {
            return Leaderboard::new();
        };

        let mut leaderboard = Leaderboard::new();
        for forum in forums {
            let posts = match backend.top_posts(forum, limit).await {
                Ok(posts) => posts,
                Err(e) => {
                    warn!(forum = %forum, "Failed to query leaderboard: {e:#}");
                    Vec::new()
                }
            };
            leaderboard.insert(forum.clone(), posts);
        }
        leaderboard
    }

    /// Number of stored posts for a forum, or `None` when disconnected or on error.
    pub async fn count_posts(&self, forum: &str) -> Option<i64> {
        let backend = self.backend.as_ref()?;
        match backend.count_posts(forum).await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(forum = %forum, "Failed to count posts: {e:#}");
                None
            }
        }
    }
}
