//! Greedy meal-plan generation.
//!
//! Each meal slot gets a fixed share of the day's calorie target. The catalog
//! is asked for foods within ±12% of that share (never below 50 kcal); if
//! nothing matches the window is widened once, and if still nothing matches the
//! slot is left out. Among candidates the food closest to the share wins, ties
//! broken by the lower id, so a plan is fully determined by its inputs and the
//! catalog contents.

use serde::Serialize;
use time::{Date, Duration, OffsetDateTime};

use super::repo::FoodCatalog;
use super::repo_types::{DayTotals, FoodItem, ItemType, MealPlanDay, MealSlot, MealType};
use super::targets::{round_half_up, targets_for, TargetInputs};
use crate::clock::Clock;

pub const PLAN_NOTE: &str = "Deterministic plan generated from foods near per-meal targets";

const TOLERANCE: f64 = 0.12;
const MIN_WINDOW_KCAL: f64 = 50.0;
const WIDEN_LOW: f64 = 0.7;
const WIDEN_HIGH: f64 = 1.3;

const THREE_MEALS: [(MealType, f64); 3] = [
    (MealType::Breakfast, 0.3),
    (MealType::Lunch, 0.4),
    (MealType::Dinner, 0.3),
];

const FOUR_MEALS: [(MealType, f64); 4] = [
    (MealType::Breakfast, 0.25),
    (MealType::Lunch, 0.35),
    (MealType::Dinner, 0.30),
    (MealType::Snack, 0.10),
];

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Catalog(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealsPerDay {
    Three,
    Four,
}

impl MealsPerDay {
    /// Slots in canonical order with their share of the day; shares sum to 1.
    pub fn distribution(self) -> &'static [(MealType, f64)] {
        match self {
            MealsPerDay::Three => &THREE_MEALS,
            MealsPerDay::Four => &FOUR_MEALS,
        }
    }
}

impl TryFrom<i64> for MealsPerDay {
    type Error = PlanError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        match n {
            3 => Ok(MealsPerDay::Three),
            4 => Ok(MealsPerDay::Four),
            other => Err(PlanError::InvalidRequest(format!(
                "mealsPerDay must be 3 or 4, got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanRequest {
    pub days: u32,
    pub meals_per_day: MealsPerDay,
    /// Overrides the profile's computed calorie target.
    pub calorie_target: Option<f64>,
}

impl PlanRequest {
    pub fn new(
        days: i64,
        meals_per_day: i64,
        calorie_target: Option<f64>,
        max_days: u32,
    ) -> Result<Self, PlanError> {
        if days < 0 {
            return Err(PlanError::InvalidRequest(format!(
                "days must not be negative, got {days}"
            )));
        }
        if days > i64::from(max_days) {
            return Err(PlanError::InvalidRequest(format!(
                "days must be at most {max_days}, got {days}"
            )));
        }
        if let Some(t) = calorie_target {
            if !t.is_finite() || t <= 0.0 {
                return Err(PlanError::InvalidRequest(
                    "calorieTarget must be a positive number".into(),
                ));
            }
        }
        Ok(Self {
            days: days as u32,
            meals_per_day: MealsPerDay::try_from(meals_per_day)?,
            calorie_target,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub days: Vec<MealPlanDay>,
    pub notes: Vec<String>,
}

/// Inclusive calorie band used to query the catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalorieWindow {
    pub min: f64,
    pub max: f64,
}

impl CalorieWindow {
    pub fn around(target: f64) -> Self {
        let tolerance = target * TOLERANCE;
        Self {
            min: (target - tolerance).max(MIN_WINDOW_KCAL),
            max: target + tolerance,
        }
    }

    pub fn widened(self) -> Self {
        Self {
            min: self.min * WIDEN_LOW,
            max: self.max * WIDEN_HIGH,
        }
    }
}

/// Per-slot calorie shares of `calorie_target`.
pub fn per_meal_targets(calorie_target: f64, meals_per_day: MealsPerDay) -> Vec<(MealType, f64)> {
    meals_per_day
        .distribution()
        .iter()
        .map(|&(meal, weight)| (meal, calorie_target * weight))
        .collect()
}

/// Candidate nearest to `target`; equal distances go to the lower id.
pub fn closest_food(candidates: Vec<FoodItem>, target: f64) -> Option<FoodItem> {
    candidates.into_iter().min_by(|a, b| {
        (a.calories - target)
            .abs()
            .total_cmp(&(b.calories - target).abs())
            .then(a.id.cmp(&b.id))
    })
}

pub struct MealPlanGenerator<'a> {
    catalog: &'a dyn FoodCatalog,
    clock: &'a dyn Clock,
}

impl<'a> MealPlanGenerator<'a> {
    pub fn new(catalog: &'a dyn FoodCatalog, clock: &'a dyn Clock) -> Self {
        Self { catalog, clock }
    }

    pub async fn generate(
        &self,
        profile: &TargetInputs,
        req: &PlanRequest,
    ) -> Result<Plan, PlanError> {
        let generated_at = self.clock.now();
        let today = self.clock.today();
        let calorie_target = match req.calorie_target {
            Some(t) => t,
            None => targets_for(profile, today).calorie_target as f64,
        };

        let mut days = Vec::with_capacity(req.days as usize);
        for offset in 0..req.days {
            let date = today
                .checked_add(Duration::days(i64::from(offset)))
                .ok_or_else(|| PlanError::InvalidRequest("plan runs past the last date".into()))?;
            days.push(self.plan_day(date, calorie_target, req.meals_per_day).await?);
        }

        Ok(Plan {
            generated_at,
            days,
            notes: vec![PLAN_NOTE.to_string()],
        })
    }

    async fn plan_day(
        &self,
        date: Date,
        calorie_target: f64,
        meals_per_day: MealsPerDay,
    ) -> Result<MealPlanDay, PlanError> {
        let mut meals = Vec::new();
        for (meal_type, target) in per_meal_targets(calorie_target, meals_per_day) {
            if let Some(food) = self.pick_food(target).await? {
                meals.push(MealSlot {
                    meal_type,
                    title: food.name,
                    item_type: ItemType::Food,
                    id: food.id,
                    calories: round_half_up(food.calories),
                });
            }
        }
        Ok(MealPlanDay {
            date,
            day_totals: DayTotals::of(&meals),
            meals,
        })
    }

    async fn pick_food(&self, target: f64) -> Result<Option<FoodItem>, PlanError> {
        let window = CalorieWindow::around(target);
        let mut candidates = self.find(window).await?;
        if candidates.is_empty() {
            candidates = self.find(window.widened()).await?;
        }
        Ok(closest_food(candidates, target))
    }

    async fn find(&self, window: CalorieWindow) -> Result<Vec<FoodItem>, PlanError> {
        self.catalog
            .find_by_calorie_range(window.min, window.max)
            .await
            .map_err(PlanError::Catalog)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::clock::FixedClock;
    use crate::nutrition::memory::{food, FailingFoodCatalog, MemoryFoodCatalog};
    use crate::nutrition::repo_types::{ActivityLevel, Goal, Sex};
    use time::macros::{date, datetime};

    fn clock() -> FixedClock {
        FixedClock(datetime!(2024-06-01 09:30 UTC))
    }

    fn request(days: u32, meals_per_day: MealsPerDay, calorie_target: Option<f64>) -> PlanRequest {
        PlanRequest {
            days,
            meals_per_day,
            calorie_target,
        }
    }

    fn reference_male() -> TargetInputs {
        TargetInputs {
            sex: Some(Sex::Male),
            height_cm: Some(170.0),
            weight_kg: Some(70.0),
            activity_level: Some(ActivityLevel::Moderate),
            goal: Some(Goal::Maintain),
            ..TargetInputs::default()
        }
    }

    fn meal_types(day: &MealPlanDay) -> Vec<MealType> {
        day.meals.iter().map(|m| m.meal_type).collect()
    }

    #[test]
    fn distributions_sum_to_one() {
        for n in [MealsPerDay::Three, MealsPerDay::Four] {
            let total: f64 = n.distribution().iter().map(|(_, w)| w).sum();
            assert!((total - 1.0).abs() < 1e-9, "{n:?}");
        }
    }

    #[test]
    fn three_meal_shares_of_2507() {
        let shares: Vec<f64> = per_meal_targets(2507.0, MealsPerDay::Three)
            .into_iter()
            .map(|(_, kcal)| (kcal * 10.0).round() / 10.0)
            .collect();
        assert_eq!(shares, vec![752.1, 1002.8, 752.1]);
    }

    #[test]
    fn window_has_floor_and_widens() {
        let w = CalorieWindow::around(500.0);
        assert!((w.min - 440.0).abs() < 1e-9);
        assert!((w.max - 560.0).abs() < 1e-9);
        let tiny = CalorieWindow::around(40.0);
        assert_eq!(tiny.min, 50.0);
        let wide = w.widened();
        assert!((wide.min - 308.0).abs() < 1e-9);
        assert!((wide.max - 728.0).abs() < 1e-9);
    }

    #[test]
    fn closest_prefers_exact_then_lower_id() {
        let exact = closest_food(vec![food(1, "near", 590.0), food(9, "exact", 600.0)], 600.0);
        assert_eq!(exact.unwrap().id, 9);

        let tie = closest_food(vec![food(5, "under", 590.0), food(3, "over", 610.0)], 600.0);
        assert_eq!(tie.unwrap().id, 3);

        assert!(closest_food(Vec::new(), 600.0).is_none());
    }

    #[test]
    fn request_validation() {
        assert!(PlanRequest::new(2, 4, None, 31).is_ok());
        assert!(PlanRequest::new(0, 3, Some(1800.0), 31).is_ok());
        for (days, meals, target) in [(-1, 3, None), (32, 3, None), (1, 5, None), (1, 2, None)] {
            assert!(
                matches!(PlanRequest::new(days, meals, target, 31), Err(PlanError::InvalidRequest(_))),
                "{days} {meals}"
            );
        }
        assert!(PlanRequest::new(1, 3, Some(0.0), 31).is_err());
        assert!(PlanRequest::new(1, 3, Some(f64::INFINITY), 31).is_err());
    }

    #[tokio::test]
    async fn two_days_of_four_meals() {
        let catalog = MemoryFoodCatalog::with_foods([
            (1, "Porridge", 500.0),
            (2, "Porridge XL", 540.0),
            (3, "Chicken bowl", 700.0),
            (4, "Salmon", 600.0),
            (5, "Apple", 200.0),
            (6, "Granola bar", 190.0),
        ]);
        let clock = clock();
        let plan = MealPlanGenerator::new(&catalog, &clock)
            .generate(&reference_male(), &request(2, MealsPerDay::Four, Some(2000.0)))
            .await
            .unwrap();

        assert_eq!(plan.days.len(), 2);
        assert_eq!(plan.days[0].date, date!(2024 - 06 - 01));
        assert_eq!(plan.days[1].date, date!(2024 - 06 - 02));
        assert_eq!(plan.generated_at, clock.0);
        assert_eq!(plan.notes, vec![PLAN_NOTE.to_string()]);
        for day in &plan.days {
            assert_eq!(
                meal_types(day),
                vec![MealType::Breakfast, MealType::Lunch, MealType::Dinner, MealType::Snack]
            );
            let ids: Vec<i64> = day.meals.iter().map(|m| m.id).collect();
            assert_eq!(ids, vec![1, 3, 4, 5]);
            assert_eq!(day.day_totals.calories, 2000);
            assert!(day.meals.iter().all(|m| m.item_type == ItemType::Food));
        }
        assert_eq!(plan.days[0].meals[1].title, "Chicken bowl");
    }

    #[tokio::test]
    async fn computed_target_drives_shares() {
        let catalog = MemoryFoodCatalog::with_foods([
            (1, "Eggs on toast", 752.4),
            (2, "Pasta", 1002.6),
            (3, "Wrap", 800.0),
        ]);
        let clock = clock();
        let plan = MealPlanGenerator::new(&catalog, &clock)
            .generate(&reference_male(), &request(1, MealsPerDay::Three, None))
            .await
            .unwrap();

        let day = &plan.days[0];
        let picked: Vec<(i64, i64)> = day.meals.iter().map(|m| (m.id, m.calories)).collect();
        assert_eq!(picked, vec![(1, 752), (2, 1003), (1, 752)]);
        assert_eq!(day.day_totals.calories, 2507);
    }

    #[tokio::test]
    async fn widens_once_then_omits_slot() {
        // shares of 1000 kcal: 300 / 400 / 300
        let catalog = MemoryFoodCatalog::with_foods([(1, "Yogurt", 230.0)]);
        let clock = clock();
        let plan = MealPlanGenerator::new(&catalog, &clock)
            .generate(&TargetInputs::default(), &request(1, MealsPerDay::Three, Some(1000.0)))
            .await
            .unwrap();

        let day = &plan.days[0];
        assert_eq!(meal_types(day), vec![MealType::Breakfast, MealType::Dinner]);
        assert_eq!(day.day_totals.calories, 460);
        // every slot missed its first window and retried exactly once
        assert_eq!(catalog.range_queries.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn oversized_foods_saturate_day_total() {
        // shares of 1e30: 3e29 / 4e29 / 3e29, all land on the one food
        let catalog = MemoryFoodCatalog::with_foods([(1, "Absurd", 3e29)]);
        let clock = clock();
        let plan = MealPlanGenerator::new(&catalog, &clock)
            .generate(&TargetInputs::default(), &request(1, MealsPerDay::Three, Some(1e30)))
            .await
            .unwrap();

        let day = &plan.days[0];
        assert_eq!(day.meals.len(), 3);
        assert!(day.meals.iter().all(|m| m.calories == i64::MAX));
        assert_eq!(day.day_totals.calories, i64::MAX);
    }

    #[tokio::test]
    async fn empty_catalog_yields_empty_days() {
        let catalog = MemoryFoodCatalog::default();
        let clock = clock();
        let plan = MealPlanGenerator::new(&catalog, &clock)
            .generate(&TargetInputs::default(), &request(3, MealsPerDay::Four, None))
            .await
            .unwrap();

        assert_eq!(plan.days.len(), 3);
        for day in &plan.days {
            assert!(day.meals.is_empty());
            assert_eq!(day.day_totals.calories, 0);
        }
    }

    #[tokio::test]
    async fn zero_days_is_an_empty_plan() {
        let catalog = MemoryFoodCatalog::with_foods([(1, "Rice", 500.0)]);
        let clock = clock();
        let plan = MealPlanGenerator::new(&catalog, &clock)
            .generate(&TargetInputs::default(), &request(0, MealsPerDay::Three, None))
            .await
            .unwrap();
        assert!(plan.days.is_empty());
        assert_eq!(catalog.range_queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn catalog_fault_propagates() {
        let clock = clock();
        let err = MealPlanGenerator::new(&FailingFoodCatalog, &clock)
            .generate(&TargetInputs::default(), &request(1, MealsPerDay::Three, None))
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::Catalog(_)));
        assert_eq!(err.to_string(), "catalog unavailable");
    }

    #[tokio::test]
    async fn identical_inputs_identical_plans() {
        let catalog = MemoryFoodCatalog::with_foods([
            (4, "B", 610.0),
            (2, "A", 590.0),
            (7, "C", 240.0),
            (8, "D", 760.0),
        ]);
        let clock = clock();
        let generator = MealPlanGenerator::new(&catalog, &clock);
        let req = request(4, MealsPerDay::Four, Some(2400.0));
        let a = generator.generate(&reference_male(), &req).await.unwrap();
        let b = generator.generate(&reference_male(), &req).await.unwrap();
        assert_eq!(a, b);
        // 2400 * 0.25 = 600: 590 and 610 are equally far, id 2 wins
        assert_eq!(a.days[0].meals[0].id, 2);
    }
}
