//! Router assembly and server startup.

use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::store::{self, TaskStore};

use super::tasks;

/// Shared application state.
pub struct AppState {
    /// Task persistence, injected so tests can wire the in-memory backend.
    pub store: Arc<dyn TaskStore>,
}

/// Build the application router around an injected store.
pub fn router(task_store: Arc<dyn TaskStore>) -> Router {
    let state = Arc::new(AppState { store: task_store });

    Router::new()
        .route("/health", get(health))
        .nest("/tasks", tasks::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let task_store =
        store::create_task_store(config.store_type, config.database_path.clone()).await?;
    if !task_store.is_persistent() {
        tracing::warn!("Using non-persistent store; tasks are lost on restart");
    }

    let app = router(task_store);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Health check endpoint.
async fn health(State(_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
