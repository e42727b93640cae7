use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::{error::ApiError, state::AppState};

use super::repo::{self, CleanupLogRow};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/cleanup", post(run_cleanup))
        .route("/admin/cleanup/history", get(cleanup_history))
}

#[derive(Debug, Default, Deserialize)]
pub struct CleanupRequest {
    #[serde(default, alias = "daysToKeep")]
    pub days_to_keep: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub message: String,
    pub deleted_meals: i64,
    pub deleted_items: i64,
}

#[instrument(skip(state, headers, payload))]
pub async fn run_cleanup(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<CleanupRequest>>,
) -> Result<Json<CleanupResponse>, ApiError> {
    require_admin(&state, &headers)?;

    let request = payload.map(|Json(body)| body).unwrap_or_default();
    let days = request
        .days_to_keep
        .unwrap_or(state.config.retention_days);
    if days < 1 {
        return Err(ApiError::validation("days_to_keep must be at least 1"));
    }

    let cutoff = OffsetDateTime::now_utc() - Duration::days(days);
    let outcome = repo::purge_before(&state.db, cutoff, days).await?;
    info!(
        days,
        deleted_meals = outcome.deleted_meals,
        deleted_items = outcome.deleted_items,
        "cleanup finished"
    );

    Ok(Json(CleanupResponse {
        success: true,
        message: format!("Deleted meals older than {days} days"),
        deleted_meals: outcome.deleted_meals,
        deleted_items: outcome.deleted_items,
    }))
}

#[instrument(skip(state, headers))]
pub async fn cleanup_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<CleanupLogRow>>, ApiError> {
    require_admin(&state, &headers)?;
    let rows = repo::history(&state.db, 50).await?;
    Ok(Json(rows))
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let supplied = headers
        .get("x-admin-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if supplied.is_empty() || supplied != state.config.admin_cleanup_key {
        warn!("cleanup request rejected, bad admin key");
        return Err(ApiError::unauthorized("Invalid admin key"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[tokio::test]
    async fn admin_key_must_match() {
        let state = AppState::for_tests();

        let mut headers = HeaderMap::new();
        assert!(require_admin(&state, &headers).is_err());

        headers.insert("x-admin-key", HeaderValue::from_static("wrong"));
        assert!(require_admin(&state, &headers).is_err());

        headers.insert("x-admin-key", HeaderValue::from_static("test-admin-key"));
        assert!(require_admin(&state, &headers).is_ok());
    }

    #[test]
    fn cleanup_request_accepts_camel_case_alias() {
        let request: CleanupRequest = serde_json::from_str(r#"{"daysToKeep": 30}"#).unwrap();
        assert_eq!(request.days_to_keep, Some(30));

        let request: CleanupRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.days_to_keep, None);
    }
}
