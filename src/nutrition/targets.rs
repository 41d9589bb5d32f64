//! Daily energy and macronutrient targets.
//!
//! Everything here is pure: optional profile facts are resolved once into a
//! [`ResolvedProfile`], then BMR (Mifflin-St Jeor), TDEE, the goal adjustment,
//! the sex-dependent floor and the macro split are applied in that order.

use serde::Serialize;
use time::Date;

use super::repo_types::{ActivityLevel, Goal, NutritionProfile, Sex};

pub const DEFAULT_AGE: i32 = 30;
pub const DEFAULT_WEIGHT_KG: f64 = 70.0;
pub const DEFAULT_HEIGHT_CM: f64 = 170.0;

const FEMALE_CALORIE_FLOOR: f64 = 1200.0;
const CALORIE_FLOOR: f64 = 1500.0;

const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_CARBS: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;

/// Facts a target computation may use. Every field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TargetInputs {
    pub sex: Option<Sex>,
    pub birthdate: Option<Date>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub goal: Option<Goal>,
}

impl From<&NutritionProfile> for TargetInputs {
    fn from(p: &NutritionProfile) -> Self {
        Self {
            sex: p.sex,
            birthdate: p.birthdate,
            height_cm: p.height_cm,
            weight_kg: p.weight_kg,
            activity_level: p.activity_level,
            goal: p.goal,
        }
    }
}

/// Fully populated inputs; defaults already substituted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedProfile {
    pub sex: Sex,
    pub age: i32,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub activity: ActivityLevel,
    pub goal: Goal,
}

impl ResolvedProfile {
    pub fn resolve(inputs: &TargetInputs, today: Date) -> Self {
        Self {
            sex: inputs.sex.unwrap_or(Sex::Unspecified),
            age: inputs
                .birthdate
                .map(|b| age_in_years(b, today))
                .unwrap_or(DEFAULT_AGE),
            weight_kg: inputs.weight_kg.unwrap_or(DEFAULT_WEIGHT_KG),
            height_cm: inputs.height_cm.unwrap_or(DEFAULT_HEIGHT_CM),
            activity: inputs.activity_level.unwrap_or(ActivityLevel::Moderate),
            goal: inputs.goal.unwrap_or(Goal::Maintain),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Macros {
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Targets {
    pub age: i32,
    #[serde(rename = "BMR")]
    pub bmr: i64,
    #[serde(rename = "TDEE")]
    pub tdee: i64,
    #[serde(rename = "calorieTarget")]
    pub calorie_target: i64,
    pub macros: Macros,
}

/// Whole years from `birthdate` to `today`, never negative.
pub fn age_in_years(birthdate: Date, today: Date) -> i32 {
    let mut years = today.year() - birthdate.year();
    if (today.month() as u8, today.day()) < (birthdate.month() as u8, birthdate.day()) {
        years -= 1;
    }
    years.max(0)
}

/// Mifflin-St Jeor. Unspecified sex takes the mean of the two equations.
pub fn bmr_mifflin_st_jeor(weight_kg: f64, height_cm: f64, age: i32, sex: Sex) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age);
    let male = base + 5.0;
    let female = base - 161.0;
    match sex {
        Sex::Male => male,
        Sex::Female => female,
        Sex::Unspecified => (male + female) / 2.0,
    }
}

pub fn activity_multiplier(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::Sedentary => 1.2,
        ActivityLevel::Light => 1.375,
        ActivityLevel::Moderate => 1.55,
        ActivityLevel::Very => 1.725,
        ActivityLevel::Extreme => 1.9,
    }
}

pub fn goal_factor(goal: Goal) -> f64 {
    match goal {
        Goal::Lose => 0.85,
        Goal::Gain => 1.10,
        Goal::Maintain => 1.0,
    }
}

pub fn calorie_floor(sex: Sex) -> f64 {
    match sex {
        Sex::Female => FEMALE_CALORIE_FLOOR,
        Sex::Male | Sex::Unspecified => CALORIE_FLOOR,
    }
}

/// (protein, fat, carbs) as fractions of total energy.
pub fn macro_split(goal: Goal) -> (f64, f64, f64) {
    match goal {
        Goal::Lose => (0.30, 0.25, 0.45),
        Goal::Gain => (0.28, 0.22, 0.50),
        Goal::Maintain => (0.25, 0.25, 0.50),
    }
}

pub fn macros_for(calories: f64, goal: Goal) -> Macros {
    let (protein, fat, carbs) = macro_split(goal);
    Macros {
        protein_g: round_tenth(calories * protein / KCAL_PER_G_PROTEIN),
        carbs_g: round_tenth(calories * carbs / KCAL_PER_G_CARBS),
        fat_g: round_tenth(calories * fat / KCAL_PER_G_FAT),
    }
}

pub fn compute(profile: &ResolvedProfile) -> Targets {
    let bmr = bmr_mifflin_st_jeor(profile.weight_kg, profile.height_cm, profile.age, profile.sex);
    let tdee = bmr * activity_multiplier(profile.activity);
    let calorie_target = (tdee * goal_factor(profile.goal)).max(calorie_floor(profile.sex));

    Targets {
        age: profile.age,
        bmr: round_half_up(bmr),
        tdee: round_half_up(tdee),
        calorie_target: round_half_up(calorie_target),
        macros: macros_for(calorie_target, profile.goal),
    }
}

/// Resolve defaults against `today`, then compute.
pub fn targets_for(inputs: &TargetInputs, today: Date) -> Targets {
    compute(&ResolvedProfile::resolve(inputs, today))
}

/// Nearest integer, halves rounded towards positive infinity.
pub(crate) fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

fn round_tenth(x: f64) -> f64 {
    (x * 10.0 + 0.5).floor() / 10.0
}
