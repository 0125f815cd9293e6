//! Client for the upstream air quality REST API.
//!
//! Every endpoint has a typed request builder whose `query_pairs()` emits
//! only the filters that endpoint accepts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::{Location, Measurement, Page, Parameter, Stats};

/// Geographic bounding box for map-viewport location queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    north: f64,
    south: f64,
    east: f64,
    west: f64,
}

impl BoundingBox {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self, AppError> {
        let lat_ok = |v: f64| v.is_finite() && (-90.0..=90.0).contains(&v);
        let lon_ok = |v: f64| v.is_finite() && (-180.0..=180.0).contains(&v);
        if !(lat_ok(north) && lat_ok(south)) {
            return Err(AppError::BadRequest(
                "north/south must be latitudes between -90 and 90".to_string(),
            ));
        }
        if !(lon_ok(east) && lon_ok(west)) {
            return Err(AppError::BadRequest(
                "east/west must be longitudes between -180 and 180".to_string(),
            ));
        }
        if south > north {
            return Err(AppError::BadRequest(
                "south must not be greater than north".to_string(),
            ));
        }
        Ok(Self {
            north,
            south,
            east,
            west,
        })
    }

    /// Build from optional query values. All four or none must be given.
    pub fn from_parts(
        north: Option<f64>,
        south: Option<f64>,
        east: Option<f64>,
        west: Option<f64>,
    ) -> Result<Option<Self>, AppError> {
        match (north, south, east, west) {
            (None, None, None, None) => Ok(None),
            (Some(n), Some(s), Some(e), Some(w)) => Self::new(n, s, e, w).map(Some),
            _ => Err(AppError::BadRequest(
                "bounding box needs all of north, south, east and west".to_string(),
            )),
        }
    }
}

/// `GET /locations`
#[derive(Debug, Clone, Default)]
pub struct LocationsQuery {
    pub bounds: Option<BoundingBox>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl LocationsQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(b) = &self.bounds {
            pairs.push(("north", b.north.to_string()));
            pairs.push(("south", b.south.to_string()));
            pairs.push(("east", b.east.to_string()));
            pairs.push(("west", b.west.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        pairs
    }
}

/// `GET /measurements`. Results are newest-first.
#[derive(Debug, Clone, Default)]
pub struct MeasurementsQuery {
    pub location_id: Option<i64>,
    pub parameter_id: Option<i64>,
    pub sensor_id: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl MeasurementsQuery {
    /// All measurements of one parameter at one location.
    pub fn series(location_id: i64, parameter_id: i64, limit: Option<u32>) -> Self {
        Self {
            location_id: Some(location_id),
            parameter_id: Some(parameter_id),
            limit,
            ..Self::default()
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = self.sensor_id {
            pairs.push(("sensor_id", id.to_string()));
        }
        if let Some(id) = self.location_id {
            pairs.push(("location_id", id.to_string()));
        }
        if let Some(id) = self.parameter_id {
            pairs.push(("parameter_id", id.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        pairs
    }
}

#[derive(Debug)]
struct CachedParameters {
    fetched_at: Instant,
    parameters: Vec<Parameter>,
}

/// Client for the upstream air quality API.
#[derive(Debug, Clone)]
pub struct AirQualityClient {
    client: reqwest::Client,
    base_url: String,
    parameter_cache_ttl: Duration,
    parameter_cache: Arc<RwLock<Option<CachedParameters>>>,
}

impl AirQualityClient {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        parameter_cache_ttl: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("airq-dashboard-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            parameter_cache_ttl,
            parameter_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// List locations, optionally restricted to a bounding box.
    pub async fn list_locations(&self, query: &LocationsQuery) -> Result<Page<Location>, AppError> {
        self.get_json("/locations", &query.query_pairs()).await
    }

    /// Free-text search over location name and locality. A blank term
    /// returns nothing without a request.
    pub async fn search_locations(
        &self,
        term: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Location>, AppError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let mut pairs = vec![("q", term.to_string())];
        if let Some(limit) = limit {
            pairs.push(("limit", limit.to_string()));
        }
        let page: Page<Location> = self.get_json("/locations/search", &pairs).await?;
        Ok(page.results)
    }

    /// One location with its sensors. A missing location is `NotFound`.
    pub async fn get_location(&self, id: i64) -> Result<Location, AppError> {
        self.get_json(&format!("/locations/{}", id), &[]).await
    }

    /// All parameters, served from an in-process cache while fresh.
    pub async fn list_parameters(&self) -> Result<Vec<Parameter>, AppError> {
        {
            let cache = self.parameter_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < self.parameter_cache_ttl {
                    return Ok(cached.parameters.clone());
                }
            }
        }

        let parameters: Vec<Parameter> = self.get_json("/parameters", &[]).await?;
        tracing::debug!("Cached {} parameters", parameters.len());

        let mut cache = self.parameter_cache.write().await;
        *cache = Some(CachedParameters {
            fetched_at: Instant::now(),
            parameters: parameters.clone(),
        });
        Ok(parameters)
    }

    /// Measurements matching the query, newest-first.
    pub async fn get_measurements(
        &self,
        query: &MeasurementsQuery,
    ) -> Result<Page<Measurement>, AppError> {
        self.get_json("/measurements", &query.query_pairs()).await
    }

    pub async fn get_stats(&self) -> Result<Stats, AppError> {
        self.get_json("/stats/overview", &[]).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::upstream_transient(format!("request to {} failed: {}", path, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("{} not found upstream", path)));
        }
        if status.is_server_error() {
            return Err(AppError::upstream_transient(format!(
                "{} returned HTTP {}",
                path, status
            )));
        }
        if !status.is_success() {
            return Err(AppError::upstream(format!(
                "{} returned HTTP {}",
                path, status
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::upstream(format!("{} JSON parse error: {}", path, e)))
    }
}
