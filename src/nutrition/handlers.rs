use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use super::{
    dto::{
        DayQuery, FoodSearch, GeneratePlanRequest, ProfileResponse, RangeQuery, TargetsQuery,
        TargetsResponse,
    },
    error::NutritionError,
    meal_logs,
    planner::{MealPlanGenerator, Plan, PlanError, PlanRequest},
    profile::{ProfileInput, ProfileResolver},
    repo::NewFood,
    repo_types::{DayTotals, FoodItem, MealPlanDay, MAX_ITEM_KCAL},
    targets::{targets_for, TargetInputs},
};
use crate::{auth::AuthUser, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/profile", get(get_profile).post(upsert_profile))
        .route("/calc/targets", get(calc_targets))
        .route("/mealplan/generate", post(generate_plan))
        .route("/mealplan/day", get(plan_for_day))
        .route("/mealplan/range", get(plans_in_range))
        .route("/mealplan/save", post(save_plan_day))
        .route("/foods", get(search_foods).post(create_food))
        .route("/foods/:id", get(get_food))
        .merge(meal_logs::routes())
}

pub(super) fn ensure_enabled(state: &AppState) -> Result<(), NutritionError> {
    if state.config.nutrition.enabled {
        Ok(())
    } else {
        Err(NutritionError::Disabled)
    }
}

/// Logs a collaborator fault and wraps it for the response.
pub(super) fn store_fault(what: &'static str) -> impl FnOnce(anyhow::Error) -> NutritionError {
    move |e| {
        error!(error = %e, what, "store call failed");
        NutritionError::Store(e)
    }
}

pub async fn ping(State(state): State<AppState>) -> Result<Json<Value>, NutritionError> {
    ensure_enabled(&state)?;
    Ok(Json(json!({ "status": "ok" })))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, NutritionError> {
    ensure_enabled(&state)?;
    let profile = ProfileResolver::new(state.profiles.as_ref(), state.clock.as_ref())
        .get_or_create(user_id)
        .await
        .map_err(store_fault("get_or_create profile"))?;
    let computed = targets_for(&TargetInputs::from(&profile), state.clock.today());
    Ok(Json(ProfileResponse { profile, computed }))
}

#[instrument(skip(state, input))]
pub async fn upsert_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(input): Json<ProfileInput>,
) -> Result<Json<ProfileResponse>, NutritionError> {
    ensure_enabled(&state)?;
    if let Err(msg) = input.validate() {
        warn!(%user_id, %msg, "invalid profile");
        return Err(NutritionError::InvalidRequest(msg));
    }
    let profile = ProfileResolver::new(state.profiles.as_ref(), state.clock.as_ref())
        .upsert(user_id, input)
        .await
        .map_err(store_fault("upsert profile"))?;
    info!(%user_id, "profile saved");
    let computed = targets_for(&TargetInputs::from(&profile), state.clock.today());
    Ok(Json(ProfileResponse { profile, computed }))
}

#[instrument(skip(state))]
pub async fn calc_targets(
    State(state): State<AppState>,
    Query(q): Query<TargetsQuery>,
) -> Result<Json<TargetsResponse>, NutritionError> {
    ensure_enabled(&state)?;
    let inputs = q.into_inputs().map_err(NutritionError::InvalidRequest)?;
    Ok(Json(TargetsResponse {
        targets: targets_for(&inputs, state.clock.today()),
        warnings: Vec::new(),
    }))
}

#[instrument(skip(state))]
pub async fn generate_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<GeneratePlanRequest>,
) -> Result<Json<Plan>, NutritionError> {
    ensure_enabled(&state)?;
    let cfg = &state.config.nutrition;
    let req = PlanRequest::new(body.days, body.meals_per_day, body.calorie_target, cfg.max_plan_days)
        .map_err(|e| {
            warn!(%user_id, error = %e, "invalid plan request");
            NutritionError::from(e)
        })?;

    let profile = ProfileResolver::new(state.profiles.as_ref(), state.clock.as_ref())
        .get_or_create(user_id)
        .await
        .map_err(store_fault("get_or_create profile"))?;

    let generator = MealPlanGenerator::new(state.foods.as_ref(), state.clock.as_ref());
    let budget = Duration::from_millis(cfg.catalog_timeout_ms);
    let plan = tokio::time::timeout(budget, generator.generate(&TargetInputs::from(&profile), &req))
        .await
        .map_err(|_| {
            warn!(%user_id, timeout_ms = cfg.catalog_timeout_ms, "plan generation timed out");
            NutritionError::Timeout
        })?
        .map_err(|e| match e {
            PlanError::Catalog(e) => store_fault("food catalog")(e),
            other => other.into(),
        })?;

    for day in &plan.days {
        state
            .plans
            .upsert_day(user_id, day)
            .await
            .map_err(store_fault("upsert plan day"))?;
    }
    info!(%user_id, days = plan.days.len(), "meal plan generated");
    Ok(Json(plan))
}

#[instrument(skip(state))]
pub async fn plan_for_day(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<DayQuery>,
) -> Result<Json<MealPlanDay>, NutritionError> {
    ensure_enabled(&state)?;
    let day = state
        .plans
        .get_day(user_id, q.date)
        .await
        .map_err(store_fault("get plan day"))?
        .unwrap_or_else(|| MealPlanDay::empty(q.date));
    Ok(Json(day))
}

#[instrument(skip(state))]
pub async fn plans_in_range(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<RangeQuery>,
) -> Result<Json<Vec<MealPlanDay>>, NutritionError> {
    ensure_enabled(&state)?;
    if q.start > q.end {
        return Err(NutritionError::InvalidRequest(
            "start must not be after end".into(),
        ));
    }
    let days = state
        .plans
        .list_range(user_id, q.start, q.end)
        .await
        .map_err(store_fault("list plan days"))?;
    Ok(Json(days))
}

#[instrument(skip(state, day))]
pub async fn save_plan_day(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(mut day): Json<MealPlanDay>,
) -> Result<Json<MealPlanDay>, NutritionError> {
    ensure_enabled(&state)?;
    if let Some(slot) = day
        .meals
        .iter()
        .find(|m| !(0..=MAX_ITEM_KCAL).contains(&m.calories))
    {
        warn!(%user_id, calories = slot.calories, "meal slot calories out of range");
        return Err(NutritionError::InvalidRequest(format!(
            "meal calories must be between 0 and {MAX_ITEM_KCAL}"
        )));
    }
    day.day_totals = DayTotals::of(&day.meals);
    state
        .plans
        .upsert_day(user_id, &day)
        .await
        .map_err(store_fault("upsert plan day"))?;
    info!(%user_id, date = %day.date, "meal plan day saved");
    Ok(Json(day))
}

#[instrument(skip(state))]
pub async fn search_foods(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Query(q): Query<FoodSearch>,
) -> Result<Json<Vec<FoodItem>>, NutritionError> {
    ensure_enabled(&state)?;
    let q = q.q.trim();
    let foods = if q.is_empty() {
        state.foods.list_all().await
    } else {
        state.foods.search_by_name(q).await
    }
    .map_err(store_fault("search foods"))?;
    Ok(Json(foods))
}

#[instrument(skip(state, food))]
pub async fn create_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(food): Json<NewFood>,
) -> Result<Json<FoodItem>, NutritionError> {
    ensure_enabled(&state)?;
    if food.name.trim().is_empty() {
        return Err(NutritionError::InvalidRequest("name is required".into()));
    }
    if !(0.0..=MAX_ITEM_KCAL as f64).contains(&food.calories) {
        return Err(NutritionError::InvalidRequest(format!(
            "calories must be between 0 and {MAX_ITEM_KCAL}"
        )));
    }
    if !food.serving_size.is_finite() || food.serving_size <= 0.0 {
        return Err(NutritionError::InvalidRequest(
            "servingSize must be a positive number".into(),
        ));
    }
    let created = state
        .foods
        .create(food)
        .await
        .map_err(store_fault("create food"))?;
    info!(%user_id, food_id = created.id, name = %created.name, "food created");
    Ok(Json(created))
}

#[instrument(skip(state))]
pub async fn get_food(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<FoodItem>, NutritionError> {
    ensure_enabled(&state)?;
    state
        .foods
        .get(id)
        .await
        .map_err(store_fault("get food"))?
        .map(Json)
        .ok_or(NutritionError::NotFound("Food"))
}
