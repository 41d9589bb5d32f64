use std::sync::Arc;

mod app;
mod auth;
mod clock;
mod config;
mod db;
mod nutrition;
mod state;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "nutriplan=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);
    if !config.nutrition.enabled {
        tracing::warn!("NUTRITION_ENABLED is false; nutrition routes will answer 404");
    }

    let pool = db::connect(&config.database_url).await?;
    db::migrate(&pool).await;

    let state = AppState::from_pool(pool, config);
    app::serve(app::build_app(state)).await
}
