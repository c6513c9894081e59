//! Append-only JSON-lines activity log.
//!
//! Every pipeline stage records one event per notable step (fetch attempt,
//! forum result, persistence outcome, run completion). Events are mirrored to
//! `tracing`; write failures are logged and otherwise ignored.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Severity of an activity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl Level {
    /// Parse a level name, case-insensitively. `WARN` is accepted for `WARNING`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "INFO" => Some(Self::Info),
            "WARNING" | "WARN" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One line of the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub timestamp: String,
    pub level: Level,
    pub stage: String,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Handle to the activity log file. Cheap to clone; writes are serialized.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl ActivityLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an event. Never fails; write errors go to `tracing`.
    pub async fn record(&self, level: Level, stage: &str, message: &str, data: Option<Value>) {
        match level {
            Level::Info => info!(stage, data = ?data, "{message}"),
            Level::Warning => warn!(stage, data = ?data, "{message}"),
            Level::Error => error!(stage, data = ?data, "{message}"),
        }

        let event = ActivityEvent {
            timestamp: Utc::now().to_rfc3339(),
            level,
            stage: stage.to_string(),
            message: message.to_string(),
            data,
        };

        if let Err(e) = self.append(&event).await {
            warn!(path = %self.path.display(), "Failed to write activity log: {e:#}");
        }
    }

    pub async fn info(&self, stage: &str, message: &str, data: Option<Value>) {
        self.record(Level::Info, stage, message, data).await;
    }

    pub async fn warning(&self, stage: &str, message: &str, data: Option<Value>) {
        self.record(Level::Warning, stage, message, data).await;
    }

    pub async fn error(&self, stage: &str, message: &str, data: Option<Value>) {
        self.record(Level::Error, stage, message, data).await;
    }

    async fn append(&self, event: &ActivityEvent) -> Result<()> {
        let mut line = serde_json::to_string(event).context("Failed to serialize event")?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .context("Failed to append event")?;
        file.flush().await.context("Failed to flush activity log")?;
        Ok(())
    }

    /// The last `limit` events, optionally filtered by level and stage.
    ///
    /// A missing file yields no events; unparsable lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub async fn recent(
        &self,
        limit: usize,
        level: Option<Level>,
        stage: Option<&str>,
    ) -> Result<Vec<ActivityEvent>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };

        Ok(filter_events(&contents, limit, level, stage))
    }
}

fn filter_events(
    contents: &str,
    limit: usize,
    level: Option<Level>,
    stage: Option<&str>,
) -> Vec<ActivityEvent> {
    let matching: Vec<ActivityEvent> = contents
        .lines()
        .filter_map(|line| serde_json::from_str::<ActivityEvent>(line).ok())
        .filter(|e| level.map_or(true, |l| e.level == l))
        .filter(|e| stage.map_or(true, |s| e.stage == s))
        .collect();

    let skip = matching.len().saturating_sub(limit);
    matching.into_iter().skip(skip).collect()
}
