//! # taskboard
//!
//! A small task-tracking HTTP service.
//!
//! Clients create, list, search, update, and delete task records over a
//! JSON API. Persistence lives behind the [`store::TaskStore`] trait with
//! two backends: SQLite for production and an in-memory map for tests.
//!
//! ## Modules
//! - `api`: axum route handlers and the HTTP status-code contract
//! - `store`: task persistence with pluggable backends
//! - `config`: environment-based configuration

pub mod api;
pub mod config;
pub mod store;

pub use config::Config;
pub use store::{Task, TaskStatus, TaskStore};
