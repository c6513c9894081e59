//! Optional JSON report of a pipeline run: forum name to its top posts.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::scoring::ScoredPost;

/// Top posts of one run, keyed by forum.
pub type Snapshot = BTreeMap<String, Vec<ScoredPost>>;

/// Write a snapshot as pretty JSON, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub async fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let json = serde_json::to_vec_pretty(snapshot).context("Failed to serialize snapshot")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
    Ok(())
}

