pub mod clock;
pub mod controller;
mod dto;
pub mod handlers;
pub mod hours;
pub mod log;
pub mod model;
pub mod repo;
mod repo_types;
pub mod store;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
