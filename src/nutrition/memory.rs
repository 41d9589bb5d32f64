//! In-memory collaborators for tests.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo::{FoodCatalog, MealLogStore, MealPlanStore, NewFood, NewMealLog, ProfileStore};
use super::repo_types::{FoodItem, MealLog, MealPlanDay, NutritionProfile};

#[derive(Default)]
pub struct MemoryProfileStore {
    rows: Mutex<BTreeMap<Uuid, NutritionProfile>>,
    pub saves: AtomicUsize,
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<NutritionProfile>> {
        Ok(self.rows.lock().unwrap().get(&user_id).cloned())
    }

    async fn save(&self, profile: NutritionProfile) -> anyhow::Result<NutritionProfile> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        let stored = match rows.get(&profile.user_id) {
            Some(existing) => NutritionProfile {
                id: existing.id,
                created_at: existing.created_at,
                ..profile
            },
            None => profile,
        };
        rows.insert(stored.user_id, stored.clone());
        Ok(stored)
    }
}

#[derive(Default)]
pub struct MemoryFoodCatalog {
    items: Mutex<Vec<FoodItem>>,
    pub range_queries: AtomicUsize,
}

impl MemoryFoodCatalog {
    pub fn with_foods(foods: impl IntoIterator<Item = (i64, &'static str, f64)>) -> Self {
        let items = foods
            .into_iter()
            .map(|(id, name, calories)| food(id, name, calories))
            .collect();
        Self {
            items: Mutex::new(items),
            range_queries: AtomicUsize::new(0),
        }
    }
}

pub fn food(id: i64, name: &str, calories: f64) -> FoodItem {
    FoodItem {
        id,
        name: name.to_string(),
        brand: None,
        serving_size: 1.0,
        serving_unit: "piece".into(),
        calories,
        protein_g: None,
        carbs_g: None,
        fat_g: None,
        fiber_g: None,
        tags: Vec::new(),
    }
}

#[async_trait]
impl FoodCatalog for MemoryFoodCatalog {
    async fn find_by_calorie_range(&self, min: f64, max: f64) -> anyhow::Result<Vec<FoodItem>> {
        self.range_queries.fetch_add(1, Ordering::SeqCst);
        let mut found: Vec<FoodItem> = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.calories >= min && f.calories <= max)
            .cloned()
            .collect();
        found.sort_by_key(|f| f.id);
        Ok(found)
    }

    async fn search_by_name(&self, q: &str) -> anyhow::Result<Vec<FoodItem>> {
        let q = q.to_lowercase();
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.name.to_lowercase().contains(&q))
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<FoodItem>> {
        Ok(self.items.lock().unwrap().clone())
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<FoodItem>> {
        Ok(self.items.lock().unwrap().iter().find(|f| f.id == id).cloned())
    }

    async fn create(&self, f: NewFood) -> anyhow::Result<FoodItem> {
        let mut items = self.items.lock().unwrap();
        let id = items.iter().map(|i| i.id).max().unwrap_or(0) + 1;
        let item = FoodItem {
            id,
            name: f.name,
            brand: f.brand,
            serving_size: f.serving_size,
            serving_unit: f.serving_unit,
            calories: f.calories,
            protein_g: f.protein_g,
            carbs_g: f.carbs_g,
            fat_g: f.fat_g,
            fiber_g: f.fiber_g,
            tags: f.tags,
        };
        items.push(item.clone());
        Ok(item)
    }
}

/// Delays every range query, otherwise delegates.
pub struct SlowFoodCatalog {
    inner: Arc<MemoryFoodCatalog>,
    delay: Duration,
}

impl SlowFoodCatalog {
    pub fn new(inner: Arc<MemoryFoodCatalog>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl FoodCatalog for SlowFoodCatalog {
    async fn find_by_calorie_range(&self, min: f64, max: f64) -> anyhow::Result<Vec<FoodItem>> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_by_calorie_range(min, max).await
    }
    async fn search_by_name(&self, q: &str) -> anyhow::Result<Vec<FoodItem>> {
        self.inner.search_by_name(q).await
    }
    async fn list_all(&self) -> anyhow::Result<Vec<FoodItem>> {
        self.inner.list_all().await
    }
    async fn get(&self, id: i64) -> anyhow::Result<Option<FoodItem>> {
        self.inner.get(id).await
    }
    async fn create(&self, f: NewFood) -> anyhow::Result<FoodItem> {
        self.inner.create(f).await
    }
}

/// Catalog whose backing storage is down.
pub struct FailingFoodCatalog;

#[async_trait]
impl FoodCatalog for FailingFoodCatalog {
    async fn find_by_calorie_range(&self, _min: f64, _max: f64) -> anyhow::Result<Vec<FoodItem>> {
        anyhow::bail!("catalog unavailable")
    }
    async fn search_by_name(&self, _q: &str) -> anyhow::Result<Vec<FoodItem>> {
        anyhow::bail!("catalog unavailable")
    }
    async fn list_all(&self) -> anyhow::Result<Vec<FoodItem>> {
        anyhow::bail!("catalog unavailable")
    }
    async fn get(&self, _id: i64) -> anyhow::Result<Option<FoodItem>> {
        anyhow::bail!("catalog unavailable")
    }
    async fn create(&self, _f: NewFood) -> anyhow::Result<FoodItem> {
        anyhow::bail!("catalog unavailable")
    }
}

#[derive(Default)]
pub struct MemoryMealPlanStore {
    days: Mutex<BTreeMap<(Uuid, Date), MealPlanDay>>,
}

#[async_trait]
impl MealPlanStore for MemoryMealPlanStore {
    async fn upsert_day(&self, user_id: Uuid, day: &MealPlanDay) -> anyhow::Result<()> {
        self.days
            .lock()
            .unwrap()
            .insert((user_id, day.date), day.clone());
        Ok(())
    }

    async fn get_day(&self, user_id: Uuid, date: Date) -> anyhow::Result<Option<MealPlanDay>> {
        Ok(self.days.lock().unwrap().get(&(user_id, date)).cloned())
    }

    async fn list_range(
        &self,
        user_id: Uuid,
        start: Date,
        end: Date,
    ) -> anyhow::Result<Vec<MealPlanDay>> {
        Ok(self
            .days
            .lock()
            .unwrap()
            .range((user_id, start)..=(user_id, end))
            .map(|(_, day)| day.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryMealLogStore {
    logs: Mutex<Vec<MealLog>>,
}

#[async_trait]
impl MealLogStore for MemoryMealLogStore {
    async fn create(&self, log: NewMealLog) -> anyhow::Result<MealLog> {
        let stored = MealLog {
            id: Uuid::new_v4(),
            user_id: log.user_id,
            date: log.date,
            meal_type: log.meal_type,
            items: log.items,
            total_calories: log.total_calories,
            created_at: OffsetDateTime::now_utc(),
        };
        self.logs.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn list_by_day(&self, user_id: Uuid, date: Date) -> anyhow::Result<Vec<MealLog>> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.user_id == user_id && l.date == date)
            .cloned()
            .collect())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let mut logs = self.logs.lock().unwrap();
        let before = logs.len();
        logs.retain(|l| !(l.id == id && l.user_id == user_id));
        Ok(logs.len() != before)
    }
}
