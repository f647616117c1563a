//! In-memory task store (non-persistent).

use super::{now_string, StoreError, Task, TaskChanges, TaskStatus, TaskStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct InMemoryTaskStore {
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    // BTreeMap keeps list() in id order without a separate sort.
    tasks: BTreeMap<i64, Task>,
    next_id: i64,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                tasks: BTreeMap::new(),
                next_id: 1,
            })),
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Case-insensitive substring match, mirroring SQLite's ASCII `LIKE`
/// semantics so both backends agree on search results.
fn matches(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|h| h.to_ascii_lowercase().contains(needle))
        .unwrap_or(false)
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn create(&self, title: &str, description: Option<&str>) -> Result<Task, StoreError> {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;

        let task = Task {
            id,
            title: title.to_string(),
            description: description.map(|s| s.to_string()),
            status: TaskStatus::Todo,
            created_at: now_string(),
        };
        inner.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn get(&self, id: i64) -> Result<Task, StoreError> {
        self.inner
            .read()
            .await
            .tasks
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.inner.read().await.tasks.values().cloned().collect())
    }

    async fn update(&self, id: i64, changes: TaskChanges) -> Result<Task, StoreError> {
        let mut inner = self.inner.write().await;
        let task = inner.tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        changes.apply(task);
        Ok(task.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .tasks
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn search(&self, query: &str) -> Result<Vec<Task>, StoreError> {
        let needle = query.to_ascii_lowercase();
        Ok(self
            .inner
            .read()
            .await
            .tasks
            .values()
            .filter(|t| {
                matches(Some(t.title.as_str()), &needle)
                    || matches(t.description.as_deref(), &needle)
            })
            .cloned()
            .collect())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.tasks.clear();
        inner.next_id = 1;
        Ok(())
    }
}
