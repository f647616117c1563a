//! Task storage module with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: SQLite database

mod memory;
mod sqlite;

pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// A task record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub created_at: String,
}

/// Task status enumeration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Todo,
    Doing,
    Done,
}

impl TaskStatus {
    /// Parse from the wire representation. Returns `None` for anything
    /// outside the closed enumeration.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TODO" => Some(Self::Todo),
            "DOING" => Some(Self::Doing),
            "DONE" => Some(Self::Done),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::Doing => "DOING",
            Self::Done => "DONE",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A partial update to a task. `None` fields are left unchanged;
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
}

impl TaskChanges {
    /// Apply these changes to a task record in place.
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
    }
}

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    NotFound(i64),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Get current timestamp as RFC3339 string.
pub fn now_string() -> String {
    Utc::now().to_rfc3339()
}

/// Task store trait - implemented by all storage backends.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Create a task with a generated id, `TODO` status, and a fresh
    /// `created_at` timestamp.
    async fn create(&self, title: &str, description: Option<&str>) -> Result<Task, StoreError>;

    /// Get a single task by id.
    async fn get(&self, id: i64) -> Result<Task, StoreError>;

    /// List all tasks in insertion (id) order.
    async fn list(&self) -> Result<Vec<Task>, StoreError>;

    /// Apply a partial update to a task and return the updated record.
    async fn update(&self, id: i64, changes: TaskChanges) -> Result<Task, StoreError>;

    /// Delete a task.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Case-insensitive substring search over title and description.
    /// The query is treated as literal text, never as query syntax.
    async fn search(&self, query: &str) -> Result<Vec<Task>, StoreError>;

    /// Delete all tasks and restart id assignment. Idempotent; used by
    /// test fixtures to reset state between runs.
    async fn reset(&self) -> Result<(), StoreError>;
}

/// Task store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStoreType {
    Memory,
    #[default]
    Sqlite,
}

impl TaskStoreType {
    /// Parse from environment variable value.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" => Self::Memory,
            "sqlite" | "db" => Self::Sqlite,
            _ => Self::default(),
        }
    }
}

/// Create a task store based on type and configuration.
pub async fn create_task_store(
    store_type: TaskStoreType,
    database_path: PathBuf,
) -> Result<Arc<dyn TaskStore>, StoreError> {
    match store_type {
        TaskStoreType::Memory => Ok(Arc::new(InMemoryTaskStore::new())),
        TaskStoreType::Sqlite => {
            let store = SqliteTaskStore::new(database_path).await?;
            Ok(Arc::new(store))
        }
    }
}
