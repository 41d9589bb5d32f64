use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

/// Knobs for the nutrition routes.
#[derive(Debug, Clone, Deserialize)]
pub struct NutritionConfig {
    pub enabled: bool,
    /// Upper bound for one plan generation, catalog queries included.
    pub catalog_timeout_ms: u64,
    pub max_plan_days: u32,
}

impl Default for NutritionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            catalog_timeout_ms: 2_000,
            max_plan_days: 31,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub nutrition: NutritionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "nutriplan".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "nutriplan-users".into()),
        };
        let defaults = NutritionConfig::default();
        let nutrition = NutritionConfig {
            enabled: std::env::var("NUTRITION_ENABLED")
                .ok()
                .and_then(|v| v.parse::<bool>().ok())
                .unwrap_or(defaults.enabled),
            catalog_timeout_ms: std::env::var("CATALOG_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(defaults.catalog_timeout_ms),
            max_plan_days: std::env::var("MAX_PLAN_DAYS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(defaults.max_plan_days),
        };
        Ok(Self {
            database_url,
            jwt,
            nutrition,
        })
    }
}
