//! In-memory record of task runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunRecord {
    pub id: u64,
    #[serde(rename = "type")]
    pub task_type: String,
    pub username: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub result: Option<String>,
}

/// Run ids are sequential, starting at 1.
#[derive(Debug, Default)]
pub struct RunTracker {
    runs: RwLock<Vec<RunRecord>>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, task_type: impl Into<String>, username: impl Into<String>) -> RunRecord {
        let mut runs = self.runs.write().await;
        let record = RunRecord {
            id: runs.len() as u64 + 1,
            task_type: task_type.into(),
            username: username.into(),
            status: RunStatus::Pending,
            started_at: Utc::now(),
            result: None,
        };
        runs.push(record.clone());
        record
    }

    pub async fn complete(&self, id: u64, result: impl Into<String>) -> Option<RunRecord> {
        self.finish(id, RunStatus::Completed, result.into()).await
    }

    pub async fn fail(&self, id: u64, error: impl Into<String>) -> Option<RunRecord> {
        self.finish(id, RunStatus::Failed, error.into()).await
    }

    async fn finish(&self, id: u64, status: RunStatus, result: String) -> Option<RunRecord> {
        let mut runs = self.runs.write().await;
        let run = runs.iter_mut().find(|r| r.id == id)?;
        run.status = status;
        run.result = Some(result);
        Some(run.clone())
    }

    pub async fn list(&self) -> Vec<RunRecord> {
        self.runs.read().await.clone()
    }
}
