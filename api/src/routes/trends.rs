//! Trend comparison across locations.
//!
//! - GET /api/v1/trends?parameter_id=N&location_ids=1,2,3
//! - GET /api/v1/trends/availability?parameter_id=N

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::locations::SeriesView;
use super::AppState;
use crate::errors::{AppError, ErrorResponse};
use crate::models::Parameter;
use crate::services::dashboard::{check_availability, load_comparison_series, Availability};
use crate::services::locations::Selection;
use crate::services::upstream::LocationsQuery;

#[derive(Debug, Deserialize, IntoParams)]
pub struct TrendsQuery {
    /// Parameter to compare
    pub parameter_id: i64,
    /// Comma-separated location ids, at most 5
    #[serde(default)]
    pub location_ids: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AvailabilityQuery {
    /// Parameter to check every location for
    pub parameter_id: i64,
}

/// One location's series for the compared parameter.
#[derive(Debug, Serialize, ToSchema)]
pub struct TrendSeries {
    pub location_id: i64,
    pub series: SeriesView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrendsResponse {
    pub parameter: Parameter,
    /// In the order the ids were given
    pub locations: Vec<TrendSeries>,
}

/// Parse "1, 2,3" into ids. Empty segments are ignored.
fn parse_location_ids(raw: &str) -> Result<Vec<i64>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| AppError::BadRequest(format!("Invalid location id '{}'", s)))
        })
        .collect()
}

/// Compare one parameter across up to five locations.
///
/// Every requested location appears in the response; a location whose
/// series failed to load has an empty series with `failed: true`.
#[utoipa::path(
    get,
    path = "/api/v1/trends",
    tag = "Trends",
    params(TrendsQuery),
    responses(
        (status = 200, description = "One series per location", body = TrendsResponse),
        (status = 400, description = "Invalid or too many location ids", body = ErrorResponse),
        (status = 404, description = "Unknown parameter", body = ErrorResponse),
        (status = 502, description = "Upstream API unreachable", body = ErrorResponse),
    )
)]
pub async fn get_trends(
    State(state): State<AppState>,
    Query(params): Query<TrendsQuery>,
) -> Result<Json<TrendsResponse>, AppError> {
    let ids = parse_location_ids(&params.location_ids)?;
    let selection = Selection::from_ids(ids).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let parameter = state
        .client
        .list_parameters()
        .await?
        .into_iter()
        .find(|p| p.id == params.parameter_id)
        .ok_or_else(|| {
            AppError::NotFound(format!("Parameter {} not found", params.parameter_id))
        })?;

    if selection.is_empty() {
        return Ok(Json(TrendsResponse {
            parameter,
            locations: Vec::new(),
        }));
    }

    let mut loaded = load_comparison_series(
        &state.client,
        selection.ids(),
        parameter.id,
        state.measurement_limit,
        &state.aggregate,
    )
    .await;

    tracing::info!(
        "Compared parameter {} across {} locations ({} failed)",
        parameter.name,
        selection.len(),
        loaded.failed.len()
    );

    let locations = selection
        .ids()
        .iter()
        .map(|&id| TrendSeries {
            location_id: id,
            series: SeriesView::take(&mut loaded, id),
        })
        .collect();

    Ok(Json(TrendsResponse {
        parameter,
        locations,
    }))
}

/// Which locations have data for a parameter.
///
/// Checks every known location with a single-measurement request. A
/// location whose check fails is reported with `has_data: false`.
#[utoipa::path(
    get,
    path = "/api/v1/trends/availability",
    tag = "Trends",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Data availability per location", body = Vec<Availability>),
        (status = 502, description = "Upstream API unreachable", body = ErrorResponse),
    )
)]
pub async fn get_availability(
    State(state): State<AppState>,
    Query(params): Query<AvailabilityQuery>,
) -> Result<Json<Vec<Availability>>, AppError> {
    let page = state
        .client
        .list_locations(&LocationsQuery::default())
        .await?;
    let ids: Vec<i64> = page.results.iter().map(|l| l.id).collect();

    Ok(Json(
        check_availability(&state.client, &ids, params.parameter_id, &state.aggregate).await,
    ))
}
