use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{ProfileResponse, UpdateGoalsRequest};
use super::repo::User;
use crate::{auth::jwt::AuthUser, error::ApiError, state::AppState};

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/goals", put(update_goals))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateGoalsRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = User::update_goals(&state.db, user_id, &payload)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    info!(user_id = %user.id, "goal limits updated");
    Ok(Json(user.into()))
}
