use serde::Deserialize;
use time::Date;
use uuid::Uuid;

use super::repo::ProfileStore;
use super::repo_types::{ActivityLevel, Goal, NutritionProfile, Sex, UnitSystem};
use super::targets::{DEFAULT_HEIGHT_CM, DEFAULT_WEIGHT_KG};
use crate::clock::Clock;

/// Full replacement for a stored profile. Absent fields become absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    pub sex: Option<Sex>,
    pub birthdate: Option<Date>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub dietary_pref: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    pub goal: Option<Goal>,
    pub target_weight_kg: Option<f64>,
    pub target_date: Option<Date>,
    pub units: Option<UnitSystem>,
}

impl ProfileInput {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("heightCm", self.height_cm),
            ("weightKg", self.weight_kg),
            ("targetWeightKg", self.target_weight_kg),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(format!("{name} must be a positive number"));
                }
            }
        }
        Ok(())
    }
}

/// Trimmed, lower-cased, deduplicated and sorted; blanks dropped.
pub fn normalize_allergies(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = tags
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

pub struct ProfileResolver<'a> {
    store: &'a dyn ProfileStore,
    clock: &'a dyn Clock,
}

impl<'a> ProfileResolver<'a> {
    pub fn new(store: &'a dyn ProfileStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Stored profile for `user_id`, creating a default one on first access.
    pub async fn get_or_create(&self, user_id: Uuid) -> anyhow::Result<NutritionProfile> {
        if let Some(existing) = self.store.get_by_user(user_id).await? {
            return Ok(existing);
        }
        let now = self.clock.now();
        let profile = NutritionProfile {
            id: Uuid::new_v4(),
            user_id,
            sex: None,
            birthdate: None,
            height_cm: Some(DEFAULT_HEIGHT_CM),
            weight_kg: Some(DEFAULT_WEIGHT_KG),
            activity_level: Some(ActivityLevel::Moderate),
            dietary_pref: None,
            allergies: Vec::new(),
            goal: Some(Goal::Maintain),
            target_weight_kg: None,
            target_date: None,
            units: Some(UnitSystem::Metric),
            created_at: now,
            updated_at: now,
        };
        self.store.save(profile).await
    }

    /// Replaces every settable field with `input`, keeping the profile's identity.
    pub async fn upsert(
        &self,
        user_id: Uuid,
        input: ProfileInput,
    ) -> anyhow::Result<NutritionProfile> {
        let now = self.clock.now();
        let (id, created_at) = match self.store.get_by_user(user_id).await? {
            Some(existing) => (existing.id, existing.created_at),
            None => (Uuid::new_v4(), now),
        };
        let profile = NutritionProfile {
            id,
            user_id,
            sex: input.sex,
            birthdate: input.birthdate,
            height_cm: input.height_cm,
            weight_kg: input.weight_kg,
            activity_level: input.activity_level,
            dietary_pref: input.dietary_pref,
            allergies: normalize_allergies(input.allergies),
            goal: input.goal,
            target_weight_kg: input.target_weight_kg,
            target_date: input.target_date,
            units: input.units,
            created_at,
            updated_at: now,
        };
        self.store.save(profile).await
    }
}
