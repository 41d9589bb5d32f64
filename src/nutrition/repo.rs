use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use time::Date;
use uuid::Uuid;

use super::repo_types::{
    FoodItem, MealLog, MealLogRow, MealPlanDay, MealType, NutritionProfile, NutritionProfileRow,
};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<NutritionProfile>>;
    /// Create-or-update keyed by user.
    async fn save(&self, profile: NutritionProfile) -> anyhow::Result<NutritionProfile>;
}

/// Read side of the food catalog used by plan generation, plus the simple
/// create/search operations behind `/foods`.
#[async_trait]
pub trait FoodCatalog: Send + Sync {
    /// Items with `min <= calories <= max`, ascending by id.
    async fn find_by_calorie_range(&self, min: f64, max: f64) -> anyhow::Result<Vec<FoodItem>>;
    async fn search_by_name(&self, q: &str) -> anyhow::Result<Vec<FoodItem>>;
    async fn list_all(&self) -> anyhow::Result<Vec<FoodItem>>;
    async fn get(&self, id: i64) -> anyhow::Result<Option<FoodItem>>;
    async fn create(&self, food: NewFood) -> anyhow::Result<FoodItem>;
}

#[async_trait]
pub trait MealPlanStore: Send + Sync {
    /// At most one stored day per `(user, date)`; a second write replaces the first.
    async fn upsert_day(&self, user_id: Uuid, day: &MealPlanDay) -> anyhow::Result<()>;
    async fn get_day(&self, user_id: Uuid, date: Date) -> anyhow::Result<Option<MealPlanDay>>;
    async fn list_range(
        &self,
        user_id: Uuid,
        start: Date,
        end: Date,
    ) -> anyhow::Result<Vec<MealPlanDay>>;
}

#[async_trait]
pub trait MealLogStore: Send + Sync {
    async fn create(&self, log: NewMealLog) -> anyhow::Result<MealLog>;
    async fn list_by_day(&self, user_id: Uuid, date: Date) -> anyhow::Result<Vec<MealLog>>;
    /// Returns false when no log with that id belongs to the user.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFood {
    pub name: String,
    pub brand: Option<String>,
    pub serving_size: f64,
    pub serving_unit: String,
    pub calories: f64,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub fiber_g: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMealLog {
    pub user_id: Uuid,
    pub date: Date,
    pub meal_type: MealType,
    pub items: serde_json::Value,
    pub total_calories: f64,
}

// ---- Postgres ----

const PROFILE_COLUMNS: &str = "id, user_id, sex, birthdate, height_cm, weight_kg, activity_level, \
     dietary_pref, allergies, goal, target_weight_kg, target_date, units, created_at, updated_at";

const FOOD_COLUMNS: &str = "id, name, brand, serving_size, serving_unit, calories, \
     protein_g, carbs_g, fat_g, fiber_g, tags";

const MEAL_LOG_COLUMNS: &str = "id, user_id, date, meal_type, items, total_calories, created_at";

#[derive(Clone)]
pub struct PgProfileStore {
    db: PgPool,
}

impl PgProfileStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<NutritionProfile>> {
        let row = sqlx::query_as::<_, NutritionProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM nutrition_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("get profile by user")?;
        Ok(row.map(Into::into))
    }

    async fn save(&self, p: NutritionProfile) -> anyhow::Result<NutritionProfile> {
        let row = sqlx::query_as::<_, NutritionProfileRow>(&format!(
            r#"
            INSERT INTO nutrition_profiles
                (id, user_id, sex, birthdate, height_cm, weight_kg, activity_level,
                 dietary_pref, allergies, goal, target_weight_kg, target_date, units)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (user_id) DO UPDATE SET
                sex = EXCLUDED.sex,
                birthdate = EXCLUDED.birthdate,
                height_cm = EXCLUDED.height_cm,
                weight_kg = EXCLUDED.weight_kg,
                activity_level = EXCLUDED.activity_level,
                dietary_pref = EXCLUDED.dietary_pref,
                allergies = EXCLUDED.allergies,
                goal = EXCLUDED.goal,
                target_weight_kg = EXCLUDED.target_weight_kg,
                target_date = EXCLUDED.target_date,
                units = EXCLUDED.units,
                updated_at = now()
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(p.id)
        .bind(p.user_id)
        .bind(p.sex.map(|s| s.as_str()))
        .bind(p.birthdate)
        .bind(p.height_cm)
        .bind(p.weight_kg)
        .bind(p.activity_level.map(|a| a.as_str()))
        .bind(p.dietary_pref)
        .bind(p.allergies)
        .bind(p.goal.map(|g| g.as_str()))
        .bind(p.target_weight_kg)
        .bind(p.target_date)
        .bind(p.units.map(|u| u.as_str()))
        .fetch_one(&self.db)
        .await
        .context("upsert profile")?;
        Ok(row.into())
    }
}

#[derive(Clone)]
pub struct PgFoodCatalog {
    db: PgPool,
}

impl PgFoodCatalog {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FoodCatalog for PgFoodCatalog {
    async fn find_by_calorie_range(&self, min: f64, max: f64) -> anyhow::Result<Vec<FoodItem>> {
        let rows = sqlx::query_as::<_, FoodItem>(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods WHERE calories BETWEEN $1 AND $2 ORDER BY id ASC"
        ))
        .bind(min)
        .bind(max)
        .fetch_all(&self.db)
        .await
        .context("find foods by calorie range")?;
        Ok(rows)
    }

    async fn search_by_name(&self, q: &str) -> anyhow::Result<Vec<FoodItem>> {
        let rows = sqlx::query_as::<_, FoodItem>(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods WHERE name ILIKE '%' || $1 || '%' ORDER BY id ASC"
        ))
        .bind(q)
        .fetch_all(&self.db)
        .await
        .context("search foods by name")?;
        Ok(rows)
    }

    async fn list_all(&self) -> anyhow::Result<Vec<FoodItem>> {
        let rows = sqlx::query_as::<_, FoodItem>(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods ORDER BY id ASC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list foods")?;
        Ok(rows)
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<FoodItem>> {
        let row = sqlx::query_as::<_, FoodItem>(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get food")?;
        Ok(row)
    }

    async fn create(&self, f: NewFood) -> anyhow::Result<FoodItem> {
        let row = sqlx::query_as::<_, FoodItem>(&format!(
            r#"
            INSERT INTO foods
                (name, brand, serving_size, serving_unit, calories,
                 protein_g, carbs_g, fat_g, fiber_g, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {FOOD_COLUMNS}
            "#
        ))
        .bind(f.name)
        .bind(f.brand)
        .bind(f.serving_size)
        .bind(f.serving_unit)
        .bind(f.calories)
        .bind(f.protein_g)
        .bind(f.carbs_g)
        .bind(f.fat_g)
        .bind(f.fiber_g)
        .bind(f.tags)
        .fetch_one(&self.db)
        .await
        .context("insert food")?;
        Ok(row)
    }
}

#[derive(Clone)]
pub struct PgMealPlanStore {
    db: PgPool,
}

impl PgMealPlanStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MealPlanStore for PgMealPlanStore {
    async fn upsert_day(&self, user_id: Uuid, day: &MealPlanDay) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO meal_plans (id, user_id, date, plan)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, date) DO UPDATE SET
                plan = EXCLUDED.plan,
                updated_at = now()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(day.date)
        .bind(Json(day))
        .execute(&self.db)
        .await
        .with_context(|| format!("upsert meal plan for {}", day.date))?;
        Ok(())
    }

    async fn get_day(&self, user_id: Uuid, date: Date) -> anyhow::Result<Option<MealPlanDay>> {
        let row = sqlx::query_as::<_, (Json<MealPlanDay>,)>(
            r#"
            SELECT plan
              FROM meal_plans
             WHERE user_id = $1 AND date = $2
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.db)
        .await
        .context("get meal plan day")?;
        Ok(row.map(|(Json(day),)| day))
    }

    async fn list_range(
        &self,
        user_id: Uuid,
        start: Date,
        end: Date,
    ) -> anyhow::Result<Vec<MealPlanDay>> {
        let rows = sqlx::query_as::<_, (Json<MealPlanDay>,)>(
            r#"
            SELECT plan
              FROM meal_plans
             WHERE user_id = $1 AND date BETWEEN $2 AND $3
             ORDER BY date ASC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await
        .context("list meal plans in range")?;
        Ok(rows.into_iter().map(|(Json(day),)| day).collect())
    }
}

#[derive(Clone)]
pub struct PgMealLogStore {
    db: PgPool,
}

impl PgMealLogStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MealLogStore for PgMealLogStore {
    async fn create(&self, log: NewMealLog) -> anyhow::Result<MealLog> {
        let row = sqlx::query_as::<_, MealLogRow>(&format!(
            r#"
            INSERT INTO meal_logs (id, user_id, date, meal_type, items, total_calories)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MEAL_LOG_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(log.user_id)
        .bind(log.date)
        .bind(log.meal_type.as_str())
        .bind(log.items)
        .bind(log.total_calories)
        .fetch_one(&self.db)
        .await
        .context("insert meal log")?;
        Ok(row.try_into()?)
    }

    async fn list_by_day(&self, user_id: Uuid, date: Date) -> anyhow::Result<Vec<MealLog>> {
        let rows = sqlx::query_as::<_, MealLogRow>(&format!(
            r#"
            SELECT {MEAL_LOG_COLUMNS}
              FROM meal_logs
             WHERE user_id = $1 AND date = $2
             ORDER BY created_at ASC
            "#
        ))
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.db)
        .await
        .context("list meal logs by day")?;
        rows.into_iter()
            .map(|r| MealLog::try_from(r).map_err(Into::into))
            .collect()
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM meal_logs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete meal log")?;
        Ok(res.rows_affected() > 0)
    }
}
