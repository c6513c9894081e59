use std::path::PathBuf;

use serde::Serialize;

use crate::scoring::ScoredPost;
use crate::store::UpsertReport;

/// Where a forum is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForumStage {
    Fetching,
    Scoring,
    Persisting,
    Done,
}

/// Outcome of one forum within a run.
#[derive(Debug, Clone, Serialize)]
pub struct ForumReport {
    pub forum: String,
    pub stage: ForumStage,
    /// Stage that failed, if any.
    pub failed_stage: Option<ForumStage>,
    pub error: Option<String>,
    pub fetched: usize,
    pub top: Vec<ScoredPost>,
    pub persisted: Option<UpsertReport>,
}

impl ForumReport {
    #[must_use]
    pub fn new(forum: &str) -> Self {
        Self {
            forum: forum.to_string(),
            stage: ForumStage::Fetching,
            failed_stage: None,
            error: None,
            fetched: 0,
            top: Vec::new(),
            persisted: None,
        }
    }

    pub(crate) fn enter(&mut self, stage: ForumStage) {
        self.stage = stage;
    }

    /// Record a failure of the current stage and finish the forum.
    pub(crate) fn fail(&mut self, error: String) {
        self.failed_stage = Some(self.stage);
        self.error = Some(error);
        self.stage = ForumStage::Done;
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.stage == ForumStage::Done
    }

    #[must_use]
    pub fn failed(&self) -> bool {
        self.failed_stage.is_some()
    }
}

/// Outcome of a whole pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: String,
    pub finished_at: String,
    pub forums: Vec<ForumReport>,
    pub snapshot_path: Option<PathBuf>,
}

impl RunReport {
    #[must_use]
    pub fn new(started_at: String) -> Self {
        Self {
            started_at,
            finished_at: String::new(),
            forums: Vec::new(),
            snapshot_path: None,
        }
    }

    /// Names of forums that failed at some stage.
    pub fn failed_forums(&self) -> impl Iterator<Item = &str> {
        self.forums
            .iter()
            .filter(|f| f.failed())
            .map(|f| f.forum.as_str())
    }

    /// One line per failed forum, for surfacing to operators.
    #[must_use]
    pub fn diagnostics(&self) -> String {
        self.forums
            .iter()
            .filter_map(|f| {
                f.error
                    .as_ref()
                    .map(|e| format!("{}: {e}", f.forum))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
