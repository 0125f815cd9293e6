//! Reference data pass-throughs.
//!
//! - GET /api/v1/parameters
//! - GET /api/v1/stats

use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::errors::{AppError, ErrorResponse};
use crate::models::{Parameter, Stats};

/// List all measured parameters (cached in-process).
#[utoipa::path(
    get,
    path = "/api/v1/parameters",
    tag = "Reference",
    responses(
        (status = 200, description = "All parameters", body = Vec<Parameter>),
        (status = 502, description = "Upstream API unreachable", body = ErrorResponse),
    )
)]
pub async fn list_parameters(
    State(state): State<AppState>,
) -> Result<Json<Vec<Parameter>>, AppError> {
    Ok(Json(state.client.list_parameters().await?))
}

/// Overview counts for the dashboard header.
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    tag = "Reference",
    responses(
        (status = 200, description = "Upstream overview statistics", body = Stats),
        (status = 502, description = "Upstream API unreachable", body = ErrorResponse),
    )
)]
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<Stats>, AppError> {
    Ok(Json(state.client.get_stats().await?))
}
