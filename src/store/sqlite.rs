//! SQLite-based task store.

use super::{now_string, StoreError, Task, TaskChanges, TaskStatus, TaskStore};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

// Plain INTEGER PRIMARY KEY: after a full delete the next rowid restarts
// at 1, which is what reset() relies on.
const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'TODO',
    created_at TEXT NOT NULL
);
"#;

pub struct SqliteTaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskStore {
    pub async fn new(database_path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::Backend(format!("Failed to create db dir: {}", e)))?;
            }
        }

        // Open database in blocking task
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&database_path)
                .map_err(|e| StoreError::Backend(format!("Failed to open database: {}", e)))?;
            conn.execute_batch(SCHEMA)
                .map_err(|e| StoreError::Backend(format!("Failed to run schema: {}", e)))?;
            Ok::<_, StoreError>(conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status_str: String = row.get(3)?;
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: TaskStatus::parse(&status_str).unwrap_or(TaskStatus::Todo),
        created_at: row.get(4)?,
    })
}

/// Escape `LIKE` wildcards so the query matches literally. The query is
/// always bound as a parameter, so this only guards wildcard semantics,
/// not injection.
fn escape_like(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for ch in query.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

const TASK_COLUMNS: &str = "id, title, description, status, created_at";

#[async_trait]
impl TaskStore for SqliteTaskStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn create(&self, title: &str, description: Option<&str>) -> Result<Task, StoreError> {
        let conn = self.conn.clone();
        let title = title.to_string();
        let description = description.map(|s| s.to_string());
        let created_at = now_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO tasks (title, description, status, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![title, description, TaskStatus::Todo.as_str(), created_at],
            )?;
            let id = conn.last_insert_rowid();
            Ok(Task {
                id,
                title,
                description,
                status: TaskStatus::Todo,
                created_at,
            })
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))?
    }

    async fn get(&self, id: i64) -> Result<Task, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.query_row(
                &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
                params![id],
                task_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))?
    }

    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt =
                conn.prepare(&format!("SELECT {} FROM tasks ORDER BY id", TASK_COLUMNS))?;
            let tasks = stmt
                .query_map([], task_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))?
    }

    async fn update(&self, id: i64, changes: TaskChanges) -> Result<Task, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();

            let mut task = conn
                .query_row(
                    &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
                    params![id],
                    task_from_row,
                )
                .optional()?
                .ok_or(StoreError::NotFound(id))?;

            changes.apply(&mut task);

            conn.execute(
                "UPDATE tasks SET title = ?1, description = ?2, status = ?3 WHERE id = ?4",
                params![task.title, task.description, task.status.as_str(), id],
            )?;
            Ok(task)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))?
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let affected = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            if affected == 0 {
                Err(StoreError::NotFound(id))
            } else {
                Ok(())
            }
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))?
    }

    async fn search(&self, query: &str) -> Result<Vec<Task>, StoreError> {
        let conn = self.conn.clone();
        let pattern = format!("%{}%", escape_like(query));

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM tasks
                 WHERE title LIKE ?1 ESCAPE '\\' OR description LIKE ?1 ESCAPE '\\'
                 ORDER BY id",
                TASK_COLUMNS
            ))?;
            let tasks = stmt
                .query_map(params![pattern], task_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))?
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute("DELETE FROM tasks", [])?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))?
    }
}
