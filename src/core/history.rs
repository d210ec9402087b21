//! Append-only cycle history with file-based persistence.
//!
//! Summaries are stored as newline-delimited JSON (JSONL), one finished
//! cycle per line, so the file can be tailed and inspected directly.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::domain::CycleSummary;

/// File-based history store using JSONL format
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Open (or prepare) the history file at `path`, creating parent directories
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create history directory: {}", parent.display()))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one summary
    pub async fn append(&self, summary: &CycleSummary) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open history file: {}", self.path.display()))?;

        let json = serde_json::to_string(summary).context("Failed to serialize cycle summary")?;
        file.write_all(format!("{}\n", json).as_bytes())
            .await
            .context("Failed to write cycle summary")?;
        file.flush().await.context("Failed to flush history file")?;

        Ok(())
    }

    /// Replay all summaries in order
    pub async fn replay(&self) -> Result<Vec<CycleSummary>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open history file: {}", self.path.display()))?;

        let mut lines = BufReader::new(file).lines();
        let mut summaries = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let summary: CycleSummary = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse cycle summary: {}", line))?;
            summaries.push(summary);
        }

        Ok(summaries)
    }

    /// The most recent `limit` summaries, oldest first
    pub async fn last(&self, limit: usize) -> Result<Vec<CycleSummary>> {
        let mut summaries = self.replay().await?;
        let start = summaries.len().saturating_sub(limit);
        Ok(summaries.split_off(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CycleOutcome, CycleState};
    use tempfile::TempDir;
    use uuid::Uuid;

    fn summary(cycle_id: u64, outcome: CycleOutcome) -> CycleSummary {
        let mut summary = CycleSummary::start(Uuid::new_v4(), cycle_id);
        summary.outcome = outcome;
        summary.topics = vec!["AI".into()];
        summary.drafts_generated = 2;
        summary.drafts_published = 1;
        summary
    }

    #[tokio::test]
    async fn test_append_and_replay() {
        let temp = TempDir::new().unwrap();
        let store = HistoryStore::open(temp.path().join("nested/history.jsonl"))
            .await
            .unwrap();

        assert!(store.replay().await.unwrap().is_empty());

        store.append(&summary(0, CycleOutcome::Completed)).await.unwrap();
        store
            .append(&summary(
                1,
                CycleOutcome::Aborted {
                    phase: CycleState::Monitoring,
                    error: "rate limited".into(),
                },
            ))
            .await
            .unwrap();

        let replayed = store.replay().await.unwrap();
        assert_eq!(replayed.len(), 2);
        assert!(replayed[0].is_completed());
        assert!(!replayed[1].is_completed());

        let last = store.last(1).await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].cycle_id, 1);
    }
}
