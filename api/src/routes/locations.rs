//! Location HTTP endpoints.
//!
//! - GET /api/v1/locations?q=&metro=&north=&south=&east=&west=
//! - GET /api/v1/locations/search?q=
//! - GET /api/v1/locations/:id

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::AppState;
use crate::errors::{AppError, ErrorResponse};
use crate::models::{Location, Measurement, Parameter, Sensor};
use crate::services::aqi::{classify, location_aqi, AqiCategory};
use crate::services::dashboard::{load_location_series, LoadedSeries};
use crate::services::locations::{filter_and_group, metro_areas, MetroFilter};
use crate::services::summary::{summarize, SeriesSummary};
use crate::services::upstream::{BoundingBox, LocationsQuery};

/// Default cap for upstream free-text search results.
const SEARCH_RESULT_LIMIT: u32 = 50;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LocationListQuery {
    /// Case-insensitive substring of the location name
    pub q: Option<String>,
    /// Exact locality to keep, or "all"
    pub metro: Option<String>,
    /// Bounding box; give all four or none
    pub north: Option<f64>,
    pub south: Option<f64>,
    pub east: Option<f64>,
    pub west: Option<f64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LocationSearchQuery {
    /// Matched against name and locality upstream
    pub q: String,
    pub limit: Option<u32>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A location with its current AQI and severity category.
#[derive(Debug, Serialize, ToSchema)]
pub struct LocationView {
    pub id: i64,
    pub name: String,
    pub locality: Option<String>,
    pub country_code: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub is_mobile: bool,
    pub last_updated: Option<DateTime<Utc>>,
    /// Upstream AQI, or derived from the PM2.5 sensor when absent
    pub aqi: Option<f64>,
    pub category: AqiCategory,
    pub sensors: Vec<Sensor>,
}

impl From<Location> for LocationView {
    fn from(loc: Location) -> Self {
        let aqi = location_aqi(&loc);
        Self {
            id: loc.id,
            name: loc.name,
            locality: loc.locality,
            country_code: loc.country_code,
            latitude: loc.latitude,
            longitude: loc.longitude,
            is_mobile: loc.is_mobile,
            last_updated: loc.last_updated,
            aqi,
            category: *classify(aqi),
            sensors: loc.sensors,
        }
    }
}

/// Locations sharing a metro area.
#[derive(Debug, Serialize, ToSchema)]
pub struct LocationGroupView {
    /// Locality, or "Other Locations"
    pub metro: String,
    pub count: usize,
    pub locations: Vec<LocationView>,
}

/// Filtered locations grouped by metro area, largest group first.
#[derive(Debug, Serialize, ToSchema)]
pub struct LocationListResponse {
    /// Locations after filtering
    pub total: usize,
    /// All metro areas before filtering, for the filter dropdown
    pub metro_areas: Vec<String>,
    pub groups: Vec<LocationGroupView>,
}

/// One series with its summary statistics.
#[derive(Debug, Serialize, ToSchema)]
pub struct SeriesView {
    pub has_data: bool,
    /// True when the fetch failed (the series is empty, not absent)
    pub failed: bool,
    pub summary: SeriesSummary,
    /// Measurements available upstream; exceeds `summary.count` when the
    /// series was fetched with a limit
    pub total: u64,
    /// Newest-first measurements
    pub measurements: Vec<Measurement>,
}

impl SeriesView {
    /// Take the series for `key` out of `loaded`.
    pub fn take(loaded: &mut LoadedSeries, key: i64) -> Self {
        let measurements = loaded.series.remove(&key).unwrap_or_default();
        Self {
            has_data: !measurements.is_empty(),
            failed: loaded.is_failed(key),
            summary: summarize(&measurements),
            total: loaded.total(key).max(measurements.len() as u64),
            measurements,
        }
    }
}

/// A parameter's series at the detail location.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParameterSeries {
    pub parameter: Parameter,
    pub series: SeriesView,
}

/// Location detail with one series per parameter.
#[derive(Debug, Serialize, ToSchema)]
pub struct LocationDetailResponse {
    pub location: LocationView,
    pub parameters: Vec<ParameterSeries>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// List locations, filtered by name and metro and grouped by metro area.
#[utoipa::path(
    get,
    path = "/api/v1/locations",
    tag = "Locations",
    params(LocationListQuery),
    responses(
        (status = 200, description = "Grouped locations", body = LocationListResponse),
        (status = 400, description = "Invalid bounding box", body = ErrorResponse),
        (status = 502, description = "Upstream API unreachable", body = ErrorResponse),
    )
)]
pub async fn list_locations(
    State(state): State<AppState>,
    Query(params): Query<LocationListQuery>,
) -> Result<Json<LocationListResponse>, AppError> {
    let bounds = BoundingBox::from_parts(params.north, params.south, params.east, params.west)?;
    let page = state
        .client
        .list_locations(&LocationsQuery {
            bounds,
            ..LocationsQuery::default()
        })
        .await?;

    let metro = MetroFilter::parse(params.metro.as_deref());
    let search = params.q.unwrap_or_default();

    Ok(Json(group_response(&page.results, &search, &metro)))
}

fn group_response(
    locations: &[Location],
    search: &str,
    metro: &MetroFilter,
) -> LocationListResponse {
    let groups: Vec<LocationGroupView> = filter_and_group(locations, search, metro)
        .into_iter()
        .map(|g| LocationGroupView {
            metro: g.metro,
            count: g.locations.len(),
            locations: g.locations.into_iter().map(LocationView::from).collect(),
        })
        .collect();

    LocationListResponse {
        total: groups.iter().map(|g| g.count).sum(),
        metro_areas: metro_areas(locations),
        groups,
    }
}

/// Free-text search over location name and locality.
#[utoipa::path(
    get,
    path = "/api/v1/locations/search",
    tag = "Locations",
    params(LocationSearchQuery),
    responses(
        (status = 200, description = "Matching locations", body = Vec<LocationView>),
        (status = 502, description = "Upstream API unreachable", body = ErrorResponse),
    )
)]
pub async fn search_locations(
    State(state): State<AppState>,
    Query(params): Query<LocationSearchQuery>,
) -> Result<Json<Vec<LocationView>>, AppError> {
    let limit = params.limit.unwrap_or(SEARCH_RESULT_LIMIT);
    let results = state.client.search_locations(&params.q, Some(limit)).await?;
    Ok(Json(results.into_iter().map(LocationView::from).collect()))
}

/// Location detail with the full history of every parameter it measures.
///
/// A missing location is a 404. Individual parameter series that fail to
/// load come back empty with `failed: true`.
#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}",
    tag = "Locations",
    params(
        ("id" = i64, Path, description = "Location id"),
    ),
    responses(
        (status = 200, description = "Location detail with series", body = LocationDetailResponse),
        (status = 404, description = "Location not found", body = ErrorResponse),
        (status = 502, description = "Upstream API unreachable", body = ErrorResponse),
    )
)]
pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LocationDetailResponse>, AppError> {
    let location = state.client.get_location(id).await.map_err(|e| match e {
        AppError::NotFound(_) => AppError::NotFound(format!("Location {} not found", id)),
        other => other,
    })?;

    let mut parameters = sensor_parameters(&location);
    if parameters.is_empty() {
        // No sensor list; try every known parameter. The location itself
        // loaded, so a parameter lookup failure only empties the page.
        parameters = match state.client.list_parameters().await {
            Ok(all) => all,
            Err(e) => {
                tracing::warn!("Location {}: parameter list unavailable: {}", id, e);
                Vec::new()
            }
        };
    }

    let mut loaded = load_location_series(
        &state.client,
        location.id,
        &parameters,
        state.measurement_limit,
        &state.aggregate,
    )
    .await;

    let parameters: Vec<ParameterSeries> = parameters
        .into_iter()
        .map(|p| ParameterSeries {
            series: SeriesView::take(&mut loaded, p.id),
            parameter: p,
        })
        .collect();

    Ok(Json(LocationDetailResponse {
        location: LocationView::from(location),
        parameters,
    }))
}

/// Parameters the location's sensors measure, in sensor order.
fn sensor_parameters(location: &Location) -> Vec<Parameter> {
    let mut measured: Vec<Parameter> = Vec::new();
    for (_, p) in location.parameter_sensors() {
        if !measured.iter().any(|m| m.id == p.id) {
            measured.push(p.clone());
        }
    }
    measured
}
