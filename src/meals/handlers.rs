use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{auth::AuthUser, error::ApiError, state::AppState, users::dto::GoalLimits, users::repo::User};

use super::day::DayKey;
use super::dto::{
    CreateMealRequest, DayQuery, FoodItemResponse, ItemsField, ListMealsQuery, MealResponse,
    MergeEditRequest, UpdateMealRequest,
};
use super::items::MealItemInput;
use super::merge::{merge_day, MealGroup};
use super::nutrition::{aggregate, NutritionTotals};
use super::repo::{self, FoodItemRow, MealPatch, MealTotalsRow};

// --- router ---

pub fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals).post(create_meal))
        .route("/meals/day", get(day_view))
        .route("/meals/stats/today", get(today_stats))
        .route("/meals/groups", put(update_group))
        .route(
            "/meals/:meal_id",
            get(get_meal).put(update_meal).delete(delete_meal),
        )
        .route("/meals/:meal_id/items", post(add_item))
        .route(
            "/meals/:meal_id/items/:item_id",
            put(update_item).delete(delete_item),
        )
}

// --- response shapes ---

#[derive(Debug, Serialize)]
pub struct DayViewResponse {
    pub date: DayKey,
    pub groups: Vec<MealGroup>,
    pub consumed: NutritionTotals,
    pub limits: GoalLimits,
}

#[derive(Debug, Serialize)]
pub struct TodayStatsResponse {
    pub date: DayKey,
    pub consumed: ConsumedToday,
    pub limits: GoalLimits,
}

#[derive(Debug, Serialize)]
pub struct ConsumedToday {
    #[serde(flatten)]
    pub totals: NutritionTotals,
    pub meal_count: i64,
}

// --- meals ---

#[instrument(skip(state, payload))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateMealRequest>,
) -> Result<(StatusCode, Json<MealResponse>), ApiError> {
    let title = payload.title.as_deref().map(str::trim).unwrap_or("");
    if title.is_empty() {
        return Err(ApiError::validation("Meal title must not be empty"));
    }

    let items = payload.valid_items();
    let notes = payload.notes.as_deref().filter(|n| !n.trim().is_empty());
    let meal_id =
        repo::create_with_items(&state.db, user_id, title, payload.consumed_at, notes, &items)
            .await?;
    info!(user_id = %user_id, meal_id = %meal_id, items = items.len(), "meal created");

    let meal = load_full_meal(&state, user_id, meal_id).await?;
    Ok((StatusCode::CREATED, Json(meal)))
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListMealsQuery>,
) -> Result<Json<Vec<MealResponse>>, ApiError> {
    let window = match query.date.as_deref() {
        Some(raw) => Some(raw.parse::<DayKey>()?.bounds()),
        None => None,
    };

    let rows = repo::list_with_totals(&state.db, user_id, window).await?;
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let items = repo::items_for_meals(&state.db, &ids).await?;
    Ok(Json(build_responses(rows, items)))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(meal_id): Path<Uuid>,
) -> Result<Json<MealResponse>, ApiError> {
    let meal = load_full_meal(&state, user_id, meal_id).await?;
    Ok(Json(meal))
}

#[instrument(skip(state, payload))]
pub async fn update_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(meal_id): Path<Uuid>,
    Json(payload): Json<UpdateMealRequest>,
) -> Result<Json<MealResponse>, ApiError> {
    let patch = field_patch(&payload)?;
    let items = payload.items_field();

    let updated = repo::update_meal(&state.db, user_id, meal_id, &patch, &items).await?;
    if !updated {
        return Err(ApiError::not_found("Meal not found"));
    }
    if let ItemsField::Replace(replacement) = &items {
        info!(user_id = %user_id, meal_id = %meal_id, items = replacement.len(), "meal items replaced");
    }

    let meal = load_full_meal(&state, user_id, meal_id).await?;
    Ok(Json(meal))
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(meal_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = repo::delete_meal(&state.db, user_id, meal_id).await?;
    if !deleted {
        return Err(ApiError::not_found("Meal not found"));
    }
    info!(user_id = %user_id, meal_id = %meal_id, "meal deleted");
    Ok(StatusCode::NO_CONTENT)
}

// --- food items ---

#[instrument(skip(state, payload))]
pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(meal_id): Path<Uuid>,
    Json(payload): Json<MealItemInput>,
) -> Result<(StatusCode, Json<FoodItemResponse>), ApiError> {
    if !repo::meal_owned(&state.db, user_id, meal_id).await? {
        return Err(ApiError::not_found("Meal not found"));
    }
    let item = payload
        .normalize()
        .ok_or_else(|| ApiError::validation("Food name must not be empty"))?;

    let row = repo::insert_item(&state.db, meal_id, &item).await?;
    info!(user_id = %user_id, meal_id = %meal_id, item_id = %row.id, "food item added");
    Ok((StatusCode::CREATED, Json(item_response(row))))
}

#[instrument(skip(state, payload))]
pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((meal_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<MealItemInput>,
) -> Result<Json<FoodItemResponse>, ApiError> {
    if !repo::meal_owned(&state.db, user_id, meal_id).await? {
        return Err(ApiError::not_found("Meal not found"));
    }
    let item = payload
        .normalize()
        .ok_or_else(|| ApiError::validation("Food name must not be empty"))?;

    let row = repo::update_item(&state.db, meal_id, item_id, &item)
        .await?
        .ok_or_else(|| ApiError::not_found("Food item not found"))?;
    Ok(Json(item_response(row)))
}

#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((meal_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    if !repo::meal_owned(&state.db, user_id, meal_id).await? {
        return Err(ApiError::not_found("Meal not found"));
    }
    let deleted = repo::delete_item(&state.db, meal_id, item_id).await?;
    if !deleted {
        return Err(ApiError::not_found("Food item not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// --- day view and stats ---

#[instrument(skip(state))]
pub async fn day_view(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<DayQuery>,
) -> Result<Json<DayViewResponse>, ApiError> {
    let day = match query.date.as_deref() {
        Some(raw) => raw.parse::<DayKey>()?,
        None => DayKey::today(),
    };

    let rows = repo::list_with_totals(&state.db, user_id, Some(day.bounds())).await?;
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let items = repo::items_for_meals(&state.db, &ids).await?;

    let meals = build_responses(rows, items);
    let groups = merge_day(&meals, day);
    let consumed = aggregate(&groups);
    let limits = load_limits(&state, user_id).await?;

    Ok(Json(DayViewResponse {
        date: day,
        groups,
        consumed,
        limits,
    }))
}

#[instrument(skip(state))]
pub async fn today_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<TodayStatsResponse>, ApiError> {
    let day = DayKey::today();
    let totals = repo::day_totals(&state.db, user_id, day.bounds()).await?;
    let limits = load_limits(&state, user_id).await?;

    Ok(Json(TodayStatsResponse {
        date: day,
        consumed: ConsumedToday {
            totals: NutritionTotals {
                calories: totals.total_calories,
                protein: totals.total_protein,
                carbs: totals.total_carbs,
                fat: totals.total_fat,
            },
            meal_count: totals.meal_count,
        },
        limits,
    }))
}

// --- merged-group editing ---

#[instrument(skip(state, payload))]
pub async fn update_group(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<MergeEditRequest>,
) -> Result<Json<MealResponse>, ApiError> {
    let (primary, rest) = match payload.meal_ids.split_first() {
        Some((first, rest)) => (*first, rest.to_vec()),
        None => return Err(ApiError::validation("meal_ids must not be empty")),
    };

    let update = payload.as_update();
    let patch = field_patch(&update)?;
    let items = update.items_field();

    let updated = repo::update_meal(&state.db, user_id, primary, &patch, &items).await?;
    if !updated {
        return Err(ApiError::not_found("Meal not found"));
    }

    // A failed secondary deletion leaves a transient duplicate; the edit
    // itself still succeeds.
    for meal_id in rest.into_iter().filter(|id| *id != primary) {
        match repo::delete_meal(&state.db, user_id, meal_id).await {
            Ok(true) => {}
            Ok(false) => warn!(user_id = %user_id, meal_id = %meal_id, "merged meal already gone"),
            Err(err) => {
                warn!(user_id = %user_id, meal_id = %meal_id, error = %err, "failed to delete merged meal")
            }
        }
    }
    info!(user_id = %user_id, primary = %primary, merged = payload.meal_ids.len(), "meal group updated");

    let meal = load_full_meal(&state, user_id, primary).await?;
    Ok(Json(meal))
}

// --- helpers ---

async fn load_full_meal(
    state: &AppState,
    user_id: Uuid,
    meal_id: Uuid,
) -> Result<MealResponse, ApiError> {
    let row = repo::get_with_totals(&state.db, user_id, meal_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Meal not found"))?;
    let items = repo::items_for_meal(&state.db, meal_id).await?;
    Ok(meal_response(
        row,
        items.into_iter().map(item_response).collect(),
    ))
}

async fn load_limits(state: &AppState, user_id: Uuid) -> Result<GoalLimits, ApiError> {
    let user = User::find_by_id(&state.db, user_id).await?;
    Ok(user.as_ref().map(GoalLimits::from).unwrap_or_default())
}

fn field_patch(payload: &UpdateMealRequest) -> Result<MealPatch, ApiError> {
    let title = match payload.title.as_deref() {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(ApiError::validation("Meal title must not be empty"));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };
    let notes = payload
        .notes
        .clone()
        .map(|n| n.filter(|s| !s.trim().is_empty()));
    Ok(MealPatch {
        title,
        consumed_at: payload.consumed_at,
        notes,
    })
}

fn build_responses(rows: Vec<MealTotalsRow>, items: Vec<FoodItemRow>) -> Vec<MealResponse> {
    let mut by_meal: HashMap<Uuid, Vec<FoodItemResponse>> = HashMap::new();
    for item in items {
        by_meal
            .entry(item.meal_id)
            .or_default()
            .push(item_response(item));
    }
    rows.into_iter()
        .map(|row| {
            let meal_items = by_meal.remove(&row.id).unwrap_or_default();
            meal_response(row, meal_items)
        })
        .collect()
}

fn meal_response(row: MealTotalsRow, items: Vec<FoodItemResponse>) -> MealResponse {
    MealResponse {
        id: row.id,
        user_id: row.user_id,
        title: row.title,
        consumed_at: row.consumed_at,
        notes: row.notes,
        created_at: row.created_at,
        updated_at: row.updated_at,
        items,
        total_calories: row.total_calories,
        total_protein: row.total_protein,
        total_carbs: row.total_carbs,
        total_fat: row.total_fat,
    }
}

fn item_response(row: FoodItemRow) -> FoodItemResponse {
    FoodItemResponse {
        id: row.id,
        meal_id: row.meal_id,
        food_name: row.food_name,
        serving_size: row.serving_size,
        calories: row.calories,
        protein_grams: row.protein_grams,
        carbs_grams: row.carbs_grams,
        fat_grams: row.fat_grams,
        position: row.position,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}
