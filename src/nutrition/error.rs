use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::planner::PlanError;

#[derive(Debug, thiserror::Error)]
pub enum NutritionError {
    #[error("Nutrition feature disabled")]
    Disabled,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("plan generation timed out")]
    Timeout,
    #[error(transparent)]
    Store(anyhow::Error),
}

impl From<PlanError> for NutritionError {
    fn from(e: PlanError) -> Self {
        match e {
            PlanError::InvalidRequest(msg) => NutritionError::InvalidRequest(msg),
            PlanError::Catalog(e) => NutritionError::Store(e),
        }
    }
}

impl NutritionError {
    pub fn status(&self) -> StatusCode {
        match self {
            NutritionError::Disabled | NutritionError::NotFound(_) => StatusCode::NOT_FOUND,
            NutritionError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            NutritionError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            NutritionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for NutritionError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
