//! HTTP API.
//!
//! Exposes the conversation agent, the task planner and stored tasks:
//! - `GET  /api/health`
//! - `POST /api/command`
//! - `GET  /api/tasks`, `POST /api/tasks`
//! - `POST /api/tasks/:id/run`
//! - `GET  /api/runs`
//! - `POST /api/planner/questions`, `POST /api/planner/answers`

pub mod routes;
pub mod types;

pub use routes::{router, serve, AppState};
