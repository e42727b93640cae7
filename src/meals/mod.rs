pub mod day;
pub mod dto;
pub mod handlers;
pub mod items;
pub mod merge;
pub mod nutrition;
mod repo;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::meal_routes()
}
