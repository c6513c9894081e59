use anyhow::Result;
use async_trait::async_trait;

use super::PostBackend;
use crate::db::{self, Database, PostRecord, PostUpsert};

/// [`PostBackend`] over the SQLite `posts` table.
#[derive(Debug, Clone)]
pub struct SqlitePostBackend {
    db: Database,
}

impl SqlitePostBackend {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostBackend for SqlitePostBackend {
    async fn upsert_post(&self, post: &PostUpsert<'_>) -> Result<()> {
        db::upsert_post(self.db.pool(), post).await
    }

    async fn top_posts(&self, forum: &str, limit: usize) -> Result<Vec<PostRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        db::get_top_posts(self.db.pool(), forum, limit).await
    }

    async fn count_posts(&self, forum: &str) -> Result<i64> {
        db::count_posts(self.db.pool(), forum).await
    }
}
