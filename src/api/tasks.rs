//! Task resource endpoints.
//!
//! Validation happens here, before anything reaches the store: empty or
//! missing titles and unknown status values are rejected with 422. The
//! store reports missing ids, which map to 404.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

use crate::store::{Task, TaskChanges, TaskStatus};

use super::error::ApiError;
use super::routes::AppState;

/// Create task resource routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/search", get(search_tasks))
        .route("/:id", get(get_task).put(update_task).delete(delete_task))
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    /// New title (must be non-empty when present)
    pub title: Option<String>,
    /// New description; explicit `null` clears it, absence leaves it alone
    #[serde(default, deserialize_with = "present_or_null")]
    pub description: Option<Option<String>>,
    /// New status; parsed against the closed enumeration
    pub status: Option<String>,
}

/// Distinguish an absent field (outer `None`) from an explicit JSON `null`
/// (`Some(None)`). Plain `Option<Option<T>>` collapses both to `None`.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".to_string()));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /tasks - Create a task. Status is always `TODO` at creation.
async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    validate_title(&req.title)?;
    let task = state
        .store
        .create(&req.title, req.description.as_deref())
        .await?;
    tracing::debug!("created task {}", task.id);
    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /tasks - List all tasks.
async fn list_tasks(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

/// GET /tasks/{id} - Get a single task.
async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(state.store.get(id).await?))
}

/// PUT /tasks/{id} - Partial update: only supplied fields change.
async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    if let Some(title) = &req.title {
        validate_title(title)?;
    }

    let status = match &req.status {
        Some(s) => Some(TaskStatus::parse(s).ok_or_else(|| {
            ApiError::Validation(format!(
                "invalid status {:?}, expected one of TODO, DOING, DONE",
                s
            ))
        })?),
        None => None,
    };

    let changes = TaskChanges {
        title: req.title,
        description: req.description,
        status,
    };
    Ok(Json(state.store.update(id, changes).await?))
}

/// DELETE /tasks/{id} - Delete a task.
async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(id).await?;
    tracing::debug!("deleted task {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /tasks/search?q=text - Substring search. An empty result is a 200
/// with an empty array, never an error.
async fn search_tasks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.store.search(&params.q).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::router;
    use crate::store::InMemoryTaskStore;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(InMemoryTaskStore::new()))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn delete(uri: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = app().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn create_and_list_task() {
        let app = app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/tasks",
                serde_json::json!({"title": "Test task", "description": "desc"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["title"], "Test task");
        assert_eq!(created["status"], "TODO");

        let response = app.oneshot(get("/tasks")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let tasks = body_json(response).await;
        assert_eq!(tasks.as_array().unwrap().len(), 1);
        assert_eq!(tasks[0]["title"], "Test task");
    }

    #[tokio::test]
    async fn create_rejects_missing_or_empty_title() {
        let app = app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/tasks",
                serde_json::json!({"description": "no title"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = app
            .oneshot(json_request(
                "POST",
                "/tasks",
                serde_json::json!({"title": "   "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn missing_description_serializes_as_null() {
        let app = app();

        let response = app
            .oneshot(json_request(
                "POST",
                "/tasks",
                serde_json::json!({"title": "bare"}),
            ))
            .await
            .unwrap();
        let created = body_json(response).await;
        assert!(created["description"].is_null());
    }

    #[tokio::test]
    async fn get_unknown_id_returns_404() {
        let response = app().oneshot(get("/tasks/42")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn update_status_and_search() {
        let app = app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/tasks",
                serde_json::json!({"title": "Injection?", "description": "demo"}),
            ))
            .await
            .unwrap();
        let task_id = body_json(response).await["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/tasks/{}", task_id),
                serde_json::json!({"status": "DONE"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["status"], "DONE");
        // Untouched fields retain their values
        assert_eq!(updated["title"], "Injection?");
        assert_eq!(updated["description"], "demo");

        let response = app.oneshot(get("/tasks/search?q=Injection")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let hits = body_json(response).await;
        assert!(hits
            .as_array()
            .unwrap()
            .iter()
            .any(|t| t["id"].as_i64() == Some(task_id)));
    }

    #[tokio::test]
    async fn update_rejects_invalid_status() {
        let app = app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/tasks",
                serde_json::json!({"title": "A task"}),
            ))
            .await
            .unwrap();
        let task_id = body_json(response).await["id"].as_i64().unwrap();

        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/tasks/{}", task_id),
                serde_json::json!({"status": "SHIPPED"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("invalid status"));
    }

    #[tokio::test]
    async fn update_unknown_id_returns_404() {
        let response = app()
            .oneshot(json_request(
                "PUT",
                "/tasks/123",
                serde_json::json!({"status": "DONE"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn explicit_null_description_clears_it() {
        let app = app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/tasks",
                serde_json::json!({"title": "Keep title", "description": "old"}),
            ))
            .await
            .unwrap();
        let task_id = body_json(response).await["id"].as_i64().unwrap();

        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/tasks/{}", task_id),
                serde_json::json!({"description": null}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert!(updated["description"].is_null());
        assert_eq!(updated["title"], "Keep title");
    }

    #[tokio::test]
    async fn delete_task_then_get_returns_404() {
        let app = app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/tasks",
                serde_json::json!({"title": "To delete", "description": null}),
            ))
            .await
            .unwrap();
        let task_id = body_json(response).await["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(delete(&format!("/tasks/{}", task_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(get(&format!("/tasks/{}", task_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_unknown_id_returns_404() {
        let response = app().oneshot(delete("/tasks/999")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn search_with_no_match_returns_empty_array() {
        let response = app().oneshot(get("/tasks/search?q=nothing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn search_with_query_syntax_characters_is_safe() {
        let app = app();

        app.clone()
            .oneshot(json_request(
                "POST",
                "/tasks",
                serde_json::json!({"title": "Ordinary"}),
            ))
            .await
            .unwrap();

        // Quotes and wildcards are data; no error, no unrelated rows
        let response = app
            .clone()
            .oneshot(get("/tasks/search?q=%22quoted%22"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));

        let response = app.oneshot(get("/tasks/search?q=%25")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn listing_after_n_creations_returns_each_exactly_once() {
        let app = app();
        let titles = ["alpha", "beta", "gamma"];

        for title in titles {
            let response = app
                .clone()
                .oneshot(json_request(
                    "POST",
                    "/tasks",
                    serde_json::json!({"title": title}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app.oneshot(get("/tasks")).await.unwrap();
        let tasks = body_json(response).await;
        let listed: Vec<&str> = tasks
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["title"].as_str().unwrap())
            .collect();
        assert_eq!(listed, titles);
    }
}
