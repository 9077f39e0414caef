//! JSON file storage for automation tasks.

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::RwLock;

use super::AutomationTask;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode tasks: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Tasks kept in memory and mirrored to a pretty-printed JSON array.
pub struct TaskStorage {
    path: PathBuf,
    tasks: RwLock<Vec<AutomationTask>>,
}

impl TaskStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tasks: RwLock::new(Vec::new()),
        }
    }

    /// Load tasks from disk.
    ///
    /// A missing file means no tasks. An unreadable or corrupt file is
    /// logged and also treated as empty.
    pub async fn initialize(&self) {
        let tasks = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => match serde_json::from_str::<Vec<AutomationTask>>(&content) {
                Ok(tasks) => tasks,
                Err(e) => {
                    tracing::warn!("Ignoring corrupt task file {}: {}", self.path.display(), e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read task file {}: {}", self.path.display(), e);
                Vec::new()
            }
        };
        tracing::info!("Loaded {} tasks from {}", tasks.len(), self.path.display());
        *self.tasks.write().await = tasks;
    }

    /// Append a task and rewrite the file.
    pub async fn add_task(&self, task: AutomationTask) -> Result<(), StorageError> {
        let mut tasks = self.tasks.write().await;
        tasks.push(task);
        let content = serde_json::to_string_pretty(&*tasks)?;
        if let Err(source) = tokio::fs::write(&self.path, content).await {
            tasks.pop();
            return Err(StorageError::Write {
                path: self.path.clone(),
                source,
            });
        }
        Ok(())
    }

    pub async fn list_tasks(&self) -> Vec<AutomationTask> {
        self.tasks.read().await.clone()
    }

    pub async fn get_task(&self, id: &str) -> Option<AutomationTask> {
        self.tasks.read().await.iter().find(|t| t.id == id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::tasks::PlanStep;

    fn sample(id: &str) -> AutomationTask {
        AutomationTask::new(id, "Star tokio", Some("Star the tokio repository".to_string()))
            .with_steps(vec![PlanStep {
                step_description: "Open repository".to_string(),
                action: "Navigate to https://github.com/tokio-rs/tokio".to_string(),
                validation_action: "Repository name is visible".to_string(),
                error_handling: None,
            }])
    }

    #[tokio::test]
    async fn missing_file_means_no_tasks() {
        let dir = TempDir::new().unwrap();
        let storage = TaskStorage::new(dir.path().join("tasks.json"));
        storage.initialize().await;
        assert!(storage.list_tasks().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_means_no_tasks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "{not json").unwrap();
        let storage = TaskStorage::new(&path);
        storage.initialize().await;
        assert!(storage.list_tasks().await.is_empty());
    }

    #[tokio::test]
    async fn added_tasks_survive_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");

        let storage = TaskStorage::new(&path);
        storage.initialize().await;
        storage.add_task(sample("1")).await.unwrap();
        storage.add_task(sample("2")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("[\n  {"));

        let reloaded = TaskStorage::new(&path);
        reloaded.initialize().await;
        assert_eq!(reloaded.list_tasks().await, vec![sample("1"), sample("2")]);
        assert_eq!(reloaded.get_task("2").await.map(|t| t.id), Some("2".to_string()));
        assert!(reloaded.get_task("3").await.is_none());
    }

    #[tokio::test]
    async fn legacy_entries_load_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, r#"[{"id": "a", "name": "Legacy", "description": null}]"#).unwrap();

        let storage = TaskStorage::new(&path);
        storage.initialize().await;
        let tasks = storage.list_tasks().await;
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].steps.is_empty());
    }

    #[tokio::test]
    async fn failed_write_keeps_memory_consistent() {
        let dir = TempDir::new().unwrap();
        let storage = TaskStorage::new(dir.path().join("missing-dir").join("tasks.json"));
        let err = storage.add_task(sample("1")).await.unwrap_err();
        assert!(matches!(err, StorageError::Write { .. }));
        assert!(storage.list_tasks().await.is_empty());
    }
}
