//! HTTP API for taskboard.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /tasks` - Create a task
//! - `GET /tasks` - List all tasks
//! - `GET /tasks/{id}` - Get a single task
//! - `PUT /tasks/{id}` - Partially update a task
//! - `DELETE /tasks/{id}` - Delete a task
//! - `GET /tasks/search?q=text` - Substring search over tasks

mod error;
mod routes;
mod tasks;

pub use error::ApiError;
pub use routes::{router, serve, AppState};
