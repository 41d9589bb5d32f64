pub mod dto;
pub mod error;
pub mod handlers;
pub mod meal_logs;
pub mod planner;
pub mod profile;
pub mod repo;
pub mod repo_types;
pub mod targets;

#[cfg(test)]
pub(crate) mod memory;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/nutrition", handlers::routes())
}
