use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Raised when a closed enumeration receives a value it does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Sex {
    Male,
    Female,
    Unspecified,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Unspecified => "other",
        }
    }
}

impl FromStr for Sex {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            "other" | "unspecified" => Ok(Sex::Unspecified),
            _ => Err(UnknownVariant::new("sex", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Very,
    Extreme,
}

impl ActivityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Very => "very",
            ActivityLevel::Extreme => "extreme",
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "light" => Ok(ActivityLevel::Light),
            "moderate" => Ok(ActivityLevel::Moderate),
            "very" => Ok(ActivityLevel::Very),
            "extreme" => Ok(ActivityLevel::Extreme),
            _ => Err(UnknownVariant::new("activity level", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Goal {
    Lose,
    Gain,
    Maintain,
}

impl Goal {
    pub fn as_str(self) -> &'static str {
        match self {
            Goal::Lose => "lose",
            Goal::Gain => "gain",
            Goal::Maintain => "maintain",
        }
    }
}

impl FromStr for Goal {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lose" => Ok(Goal::Lose),
            "gain" => Ok(Goal::Gain),
            "maintain" => Ok(Goal::Maintain),
            _ => Err(UnknownVariant::new("goal", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum UnitSystem {
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }
}

impl FromStr for UnitSystem {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metric" => Ok(UnitSystem::Metric),
            "imperial" => Ok(UnitSystem::Imperial),
            _ => Err(UnknownVariant::new("unit system", s)),
        }
    }
}

/// Meal slots in canonical day order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl FromStr for MealType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            _ => Err(UnknownVariant::new("meal type", s)),
        }
    }
}

macro_rules! string_conversions {
    ($($ty:ty),* $(,)?) => {$(
        impl TryFrom<String> for $ty {
            type Error = UnknownVariant;
            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for &'static str {
            fn from(value: $ty) -> Self {
                value.as_str()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    )*};
}

string_conversions!(Sex, ActivityLevel, Goal, UnitSystem, MealType);

/// Stored nutrition profile. One per user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sex: Option<Sex>,
    pub birthdate: Option<Date>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub dietary_pref: Option<String>,
    pub allergies: Vec<String>,
    pub goal: Option<Goal>,
    pub target_weight_kg: Option<f64>,
    pub target_date: Option<Date>,
    pub units: Option<UnitSystem>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct NutritionProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sex: Option<String>,
    pub birthdate: Option<Date>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub activity_level: Option<String>,
    pub dietary_pref: Option<String>,
    pub allergies: Vec<String>,
    pub goal: Option<String>,
    pub target_weight_kg: Option<f64>,
    pub target_date: Option<Date>,
    pub units: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

// Rows written by older clients may carry values we no longer accept; those read back as absent.
impl From<NutritionProfileRow> for NutritionProfile {
    fn from(r: NutritionProfileRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            sex: r.sex.and_then(|s| s.parse().ok()),
            birthdate: r.birthdate,
            height_cm: r.height_cm,
            weight_kg: r.weight_kg,
            activity_level: r.activity_level.and_then(|s| s.parse().ok()),
            dietary_pref: r.dietary_pref,
            allergies: r.allergies,
            goal: r.goal.and_then(|s| s.parse().ok()),
            target_weight_kg: r.target_weight_kg,
            target_date: r.target_date,
            units: r.units.and_then(|s| s.parse().ok()),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    pub id: i64,
    pub name: String,
    pub brand: Option<String>,
    pub serving_size: f64,
    pub serving_unit: String,
    /// kcal per serving
    pub calories: f64,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub fiber_g: Option<f64>,
    pub tags: Vec<String>,
}

/// Upper bound on the kcal of a single food or plan slot.
pub const MAX_ITEM_KCAL: i64 = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Food,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealSlot {
    pub meal_type: MealType,
    pub title: String,
    pub item_type: ItemType,
    pub id: i64,
    pub calories: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotals {
    pub calories: i64,
}

impl DayTotals {
    /// Saturates at `i64::MAX` instead of overflowing.
    pub fn of(meals: &[MealSlot]) -> Self {
        Self {
            calories: meals
                .iter()
                .fold(0i64, |acc, m| acc.saturating_add(m.calories)),
        }
    }
}

/// One day of a plan; this is also the stored shape keyed by `(user, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanDay {
    pub date: Date,
    pub meals: Vec<MealSlot>,
    pub day_totals: DayTotals,
}

impl MealPlanDay {
    /// Placeholder returned when nothing is stored for `date`.
    pub fn empty(date: Date) -> Self {
        Self {
            date,
            meals: Vec::new(),
            day_totals: DayTotals::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: Date,
    pub meal_type: MealType,
    pub items: serde_json::Value,
    pub total_calories: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct MealLogRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: Date,
    pub meal_type: String,
    pub items: serde_json::Value,
    pub total_calories: f64,
    pub created_at: OffsetDateTime,
}

impl TryFrom<MealLogRow> for MealLog {
    type Error = UnknownVariant;

    fn try_from(r: MealLogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            date: r.date,
            meal_type: r.meal_type.parse()?,
            items: r.items,
            total_calories: r.total_calories,
            created_at: r.created_at,
        })
    }
}
