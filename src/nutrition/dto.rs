use serde::{Deserialize, Serialize};
use time::Date;

use super::repo_types::{ActivityLevel, Goal, MealLog, MealType, NutritionProfile, Sex};
use super::targets::{TargetInputs, Targets};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: NutritionProfile,
    pub computed: Targets,
}

/// Query string of `GET /calc/targets`. Blank optional values count as absent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetsQuery {
    pub weight_kg: f64,
    pub height_cm: f64,
    pub birthdate: Option<String>,
    pub sex: Option<String>,
    pub activity_level: Option<String>,
    pub goal: Option<String>,
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl TargetsQuery {
    pub fn into_inputs(self) -> Result<TargetInputs, String> {
        for (name, v) in [("weightKg", self.weight_kg), ("heightCm", self.height_cm)] {
            if !v.is_finite() || v <= 0.0 {
                return Err(format!("{name} must be a positive number"));
            }
        }
        let birthdate = non_blank(&self.birthdate)
            .map(|s| {
                Date::parse(s, time::macros::format_description!("[year]-[month]-[day]"))
                    .map_err(|_| format!("birthdate '{s}' is not an ISO date"))
            })
            .transpose()?;
        Ok(TargetInputs {
            sex: non_blank(&self.sex)
                .map(str::parse::<Sex>)
                .transpose()
                .map_err(|e| e.to_string())?,
            birthdate,
            height_cm: Some(self.height_cm),
            weight_kg: Some(self.weight_kg),
            activity_level: non_blank(&self.activity_level)
                .map(str::parse::<ActivityLevel>)
                .transpose()
                .map_err(|e| e.to_string())?,
            goal: non_blank(&self.goal)
                .map(str::parse::<Goal>)
                .transpose()
                .map_err(|e| e.to_string())?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TargetsResponse {
    #[serde(flatten)]
    pub targets: Targets,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanRequest {
    #[serde(default = "default_days")]
    pub days: i64,
    #[serde(default = "default_meals_per_day")]
    pub meals_per_day: i64,
    pub calorie_target: Option<f64>,
}

fn default_days() -> i64 {
    1
}

fn default_meals_per_day() -> i64 {
    4
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: Date,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: Date,
    pub end: Date,
}

#[derive(Debug, Deserialize)]
pub struct FoodSearch {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealLogItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbs_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat_g: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMealRequest {
    pub date: Date,
    pub meal_type: MealType,
    #[serde(default)]
    pub items: Vec<MealLogItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub calories_target: f64,
    pub calories_consumed: f64,
}

#[derive(Debug, Serialize)]
pub struct MealsForDay {
    pub logs: Vec<MealLog>,
    pub summary: DaySummary,
}
