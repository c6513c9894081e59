//! Fetch → score → persist orchestration across the configured forums.
//!
//! Forums are processed strictly one after another. Each forum moves through
//! [`ForumStage::Fetching`], [`ForumStage::Scoring`] and
//! [`ForumStage::Persisting`] to [`ForumStage::Done`]; a failing stage jumps
//! straight to `Done` and is recorded on the forum's report without undoing
//! earlier stages. One forum failing never stops the others.

mod report;

pub use report::{ForumReport, ForumStage, RunReport};

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{sleep, MissedTickBehavior};
use tracing::{error, info};

use crate::activity::ActivityLog;
use crate::config::Config;
use crate::scoring::score_posts;
use crate::snapshot::{write_snapshot, Snapshot};
use crate::source::{FetchError, SourceClient};
use crate::store::Store;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no forums configured")]
    NoForums,
}

/// Runs the harvest pipeline. Concurrent callers are serialized.
#[derive(Debug)]
pub struct Pipeline {
    config: Arc<Config>,
    source: SourceClient,
    store: Store,
    activity: ActivityLog,
    run_lock: Mutex<()>,
}

impl Pipeline {
    /// Build a pipeline around an already-connected (or disconnected) store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: Arc<Config>, store: Store, activity: ActivityLog) -> Result<Self> {
        let source = SourceClient::new(&config)?.with_activity(activity.clone());
        Ok(Self {
            config,
            source,
            store,
            activity,
            run_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Run the pipeline once over every configured forum.
    ///
    /// Fetch and persistence failures are recorded on the per-forum reports
    /// and do not fail the run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoForums`] if there is nothing to process.
    pub async fn run_once(&self) -> Result<RunReport, PipelineError> {
        let forums = &self.config.forums;
        if forums.is_empty() {
            return Err(PipelineError::NoForums);
        }

        let _guard = self.run_lock.lock().await;
        let started = Instant::now();
        let mut report = RunReport::new(Utc::now().to_rfc3339());

        self.activity
            .info(
                "pipeline",
                "Starting fetch",
                Some(json!({ "forums": forums })),
            )
            .await;

        for (i, forum) in forums.iter().enumerate() {
            if i > 0 && !self.config.forum_pause.is_zero() {
                sleep(self.config.forum_pause).await;
            }
            report.forums.push(self.fetch_and_score(forum).await);
        }

        self.save_snapshot(&mut report).await;
        self.persist(&mut report).await;

        report.finished_at = Utc::now().to_rfc3339();
        let failed: Vec<&str> = report.failed_forums().collect();
        self.activity
            .info(
                "pipeline",
                "Execution completed",
                Some(json!({
                    "forums": forums.len(),
                    "failed_forums": failed,
                    "duration_ms": duration_ms(started.elapsed()),
                })),
            )
            .await;

        Ok(report)
    }

    async fn fetch_and_score(&self, forum: &str) -> ForumReport {
        let mut forum_report = ForumReport::new(forum);
        let limit = self.config.fetch_limit;

        self.activity
            .info(
                "source",
                "Fetching posts",
                Some(json!({ "forum": forum, "limit": limit })),
            )
            .await;

        let posts = match self.source.fetch_posts(forum, limit).await {
            Ok(posts) => posts,
            Err(e) => {
                self.record_fetch_failure(forum, &e).await;
                forum_report.fail(format!("fetch failed: {e}"));
                return forum_report;
            }
        };

        if posts.is_empty() {
            self.activity
                .warning("source", "No posts found", Some(json!({ "forum": forum })))
                .await;
        }

        forum_report.enter(ForumStage::Scoring);
        forum_report.fetched = posts.len();
        forum_report.top = score_posts(posts, self.config.top_n);

        self.activity
            .info(
                "pipeline",
                "Analyzed forum",
                Some(json!({
                    "forum": forum,
                    "posts_fetched": forum_report.fetched,
                    "top_posts": forum_report.top.len(),
                })),
            )
            .await;

        forum_report
    }

    async fn record_fetch_failure(&self, forum: &str, e: &FetchError) {
        self.activity
            .error(
                "source",
                "Failed to fetch posts",
                Some(json!({ "forum": forum, "error": e.to_string() })),
            )
            .await;
    }

    async fn save_snapshot(&self, report: &mut RunReport) {
        let Some(path) = self.config.snapshot_path.as_deref() else {
            return;
        };

        let snapshot: Snapshot = report
            .forums
            .iter()
            .map(|f| (f.forum.clone(), f.top.clone()))
            .collect();

        match write_snapshot(path, &snapshot).await {
            Ok(()) => {
                report.snapshot_path = Some(path.to_path_buf());
                self.activity
                    .info(
                        "snapshot",
                        "Results saved to JSON",
                        Some(json!({ "path": path.display().to_string() })),
                    )
                    .await;
            }
            Err(e) => {
                self.activity
                    .error(
                        "snapshot",
                        "Failed to save results to JSON",
                        Some(json!({ "path": path.display().to_string(), "error": format!("{e:#}") })),
                    )
                    .await;
            }
        }
    }

    async fn persist(&self, report: &mut RunReport) {
        if !self.store.is_connected() {
            self.activity
                .warning(
                    "store",
                    "Database not connected, results not persisted",
                    None,
                )
                .await;
        }

        for forum_report in report.forums.iter_mut().filter(|f| !f.is_done()) {
            forum_report.enter(ForumStage::Persisting);

            match self
                .store
                .upsert(&forum_report.forum, &forum_report.top)
                .await
            {
                Ok(upserted) => {
                    forum_report.persisted = Some(upserted);
                    let data = json!({
                        "forum": forum_report.forum,
                        "upserted": upserted.upserted,
                        "failed": upserted.failed,
                    });
                    if upserted.failed > 0 {
                        self.activity
                            .warning("store", "Some posts failed to save", Some(data))
                            .await;
                    } else {
                        self.activity
                            .info("store", "Results saved to database", Some(data))
                            .await;
                    }
                    forum_report.enter(ForumStage::Done);
                }
                Err(e) => {
                    if self.store.is_connected() {
                        self.activity
                            .error(
                                "store",
                                "Failed to save results to database",
                                Some(json!({ "forum": forum_report.forum, "error": e.to_string() })),
                            )
                            .await;
                    }
                    forum_report.fail(format!("persist failed: {e}"));
                }
            }
        }
    }
}

/// Run the pipeline forever, once per `interval`, starting immediately.
pub async fn refresh_loop(pipeline: Arc<Pipeline>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match pipeline.run_once().await {
            Ok(report) => info!(
                forums = report.forums.len(),
                failed = report.failed_forums().count(),
                "Scheduled refresh complete"
            ),
            Err(e) => error!("Scheduled refresh failed: {e}"),
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
