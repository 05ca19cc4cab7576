//! Persistence of the run summary artifact.
//!
//! One JSON file per completed run, named after the run's start time.
//! Written only when Phase 2 finishes; an aborted run leaves no artifact.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::pipeline::RunSummary;

/// Errors that can occur while writing the summary artifact.
#[derive(Debug, Error)]
pub enum ExportError {
    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes run summaries into an output directory.
pub struct SummaryWriter {
    output_dir: PathBuf,
}

impl SummaryWriter {
    /// Create a writer targeting `output_dir`. The directory is created
    /// on first write.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// The directory artifacts are written into.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the summary as a timestamped JSON artifact, returning its
    /// path.
    pub async fn write(&self, summary: &RunSummary) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.output_dir).await?;

        let filename = format!(
            "orders_{}.json",
            summary.started_at.format("%Y%m%d_%H%M%S")
        );
        let path = self.output_dir.join(filename);

        let bytes = serde_json::to_vec_pretty(summary)?;
        fs::write(&path, bytes).await?;

        info!(
            path = %path.display(),
            orders = summary.orders_seen,
            "Run summary written"
        );

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TagUpdateResult;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_summary() -> RunSummary {
        let order = crate::gateway::Order {
            id: "gid://shopify/Order/1".to_string(),
            name: "#1001".to_string(),
            tags: vec!["vip".to_string()],
            transactions: vec![],
        };

        RunSummary::from_results(
            Uuid::new_v4(),
            Utc::now(),
            vec![TagUpdateResult::tagged(
                &order,
                "manual".to_string(),
                vec!["vip".to_string(), "manual".to_string()],
            )],
        )
    }

    #[tokio::test]
    async fn test_write_creates_directory_and_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = SummaryWriter::new(dir.path().join("runs"));

        let path = writer.write(&sample_summary()).await.expect("write");

        assert!(path.exists());
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("orders_") && n.ends_with(".json"))
            .unwrap_or(false));
    }

    #[tokio::test]
    async fn test_written_artifact_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = SummaryWriter::new(dir.path());
        let summary = sample_summary();

        let path = writer.write(&summary).await.expect("write");

        let bytes = tokio::fs::read(&path).await.expect("read back");
        let loaded: RunSummary = serde_json::from_slice(&bytes).expect("parse");

        assert_eq!(loaded.run_id, summary.run_id);
        assert_eq!(loaded.orders_seen, 1);
        assert_eq!(loaded.results[0].tags, vec!["vip", "manual"]);
    }
}
