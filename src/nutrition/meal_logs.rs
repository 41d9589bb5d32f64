use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{DayQuery, DaySummary, LogMealRequest, MealLogItem, MealsForDay},
    error::NutritionError,
    handlers::{ensure_enabled, store_fault},
    profile::ProfileResolver,
    repo::NewMealLog,
    repo_types::MealLog,
    targets::{targets_for, TargetInputs},
};
use crate::{auth::AuthUser, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/meals", post(log_meal))
        .route("/meals/day", get(meals_for_day))
        .route("/meals/:id", delete(delete_meal))
}

/// Items without calories count as zero.
pub fn total_calories(items: &[MealLogItem]) -> f64 {
    items.iter().filter_map(|i| i.calories).sum()
}

#[instrument(skip(state, req))]
pub async fn log_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<LogMealRequest>,
) -> Result<Json<MealLog>, NutritionError> {
    ensure_enabled(&state)?;
    if req.items.iter().filter_map(|i| i.calories).any(|c| !c.is_finite() || c < 0.0) {
        return Err(NutritionError::InvalidRequest(
            "item calories must be non-negative numbers".into(),
        ));
    }
    let total = total_calories(&req.items);
    let items = serde_json::to_value(&req.items)
        .map_err(|e| NutritionError::Store(anyhow::Error::new(e)))?;
    let log = state
        .meal_logs
        .create(NewMealLog {
            user_id,
            date: req.date,
            meal_type: req.meal_type,
            items,
            total_calories: total,
        })
        .await
        .map_err(store_fault("create meal log"))?;
    info!(%user_id, log_id = %log.id, total, "meal logged");
    Ok(Json(log))
}

#[instrument(skip(state))]
pub async fn meals_for_day(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<DayQuery>,
) -> Result<Json<MealsForDay>, NutritionError> {
    ensure_enabled(&state)?;
    let logs = state
        .meal_logs
        .list_by_day(user_id, q.date)
        .await
        .map_err(store_fault("list meal logs"))?;
    let profile = ProfileResolver::new(state.profiles.as_ref(), state.clock.as_ref())
        .get_or_create(user_id)
        .await
        .map_err(store_fault("get_or_create profile"))?;
    let target = targets_for(&TargetInputs::from(&profile), state.clock.today()).calorie_target;
    let consumed = logs.iter().map(|l| l.total_calories).sum();
    Ok(Json(MealsForDay {
        logs,
        summary: DaySummary {
            calories_target: target as f64,
            calories_consumed: consumed,
        },
    }))
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, NutritionError> {
    ensure_enabled(&state)?;
    let removed = state
        .meal_logs
        .delete(user_id, id)
        .await
        .map_err(store_fault("delete meal log"))?;
    if removed {
        info!(%user_id, %id, "meal log deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        warn!(%user_id, %id, "meal log not found");
        Err(NutritionError::NotFound("Meal log"))
    }
}
