//! Series loading for the dashboard views.
//!
//! - Location detail: one series per parameter at a single location.
//! - Trend comparison: one series per location for a single parameter.
//! - Data availability: a one-measurement probe per location, used to mark
//!   which locations have data for a parameter before comparing them.
//!
//! All go through [`aggregate`], so a slow or failing series never blocks
//! the others.

use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Measurement, Page, Parameter, SeriesMap};
use crate::services::aggregator::{aggregate, AggregateOptions, RecordingObserver};
use crate::services::upstream::{AirQualityClient, MeasurementsQuery};

/// Aggregated series plus the keys whose fetch failed.
#[derive(Debug, Default)]
pub struct LoadedSeries {
    pub series: SeriesMap<i64>,
    /// Upstream match counts; larger than the series when a limit applies
    pub totals: HashMap<i64, u64>,
    pub failed: Vec<i64>,
}

impl LoadedSeries {
    fn from_pages(pages: HashMap<i64, Page<Measurement>>, failed: Vec<i64>) -> Self {
        let mut loaded = LoadedSeries {
            failed,
            ..LoadedSeries::default()
        };
        for (key, page) in pages {
            loaded.totals.insert(key, page.total());
            loaded.series.insert(key, page.results);
        }
        loaded
    }

    pub fn is_failed(&self, key: i64) -> bool {
        self.failed.contains(&key)
    }

    /// Upstream total for `key`, 0 when unknown or failed.
    pub fn total(&self, key: i64) -> u64 {
        self.totals.get(&key).copied().unwrap_or(0)
    }
}

/// Whether a location has any measurements for a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Availability {
    pub location_id: i64,
    pub has_data: bool,
    /// Measurements available upstream
    pub total: u64,
}

async fn load_pages<E>(
    client: &AirQualityClient,
    entities: &[E],
    key_fn: impl Fn(&E) -> i64,
    query_fn: impl Fn(&E) -> MeasurementsQuery,
    options: &AggregateOptions,
) -> LoadedSeries {
    let observer: RecordingObserver<i64> = RecordingObserver::new();
    let pages = aggregate(
        entities,
        key_fn,
        |entity| {
            let query = query_fn(entity);
            async move { client.get_measurements(&query).await }
        },
        options,
        &observer,
    )
    .await;

    LoadedSeries::from_pages(pages, observer.failed_keys())
}

/// Load every parameter's series at one location, keyed by parameter id.
pub async fn load_location_series(
    client: &AirQualityClient,
    location_id: i64,
    parameters: &[Parameter],
    limit: Option<u32>,
    options: &AggregateOptions,
) -> LoadedSeries {
    let loaded = load_pages(
        client,
        parameters,
        |p| p.id,
        |p| MeasurementsQuery::series(location_id, p.id, limit),
        options,
    )
    .await;

    tracing::info!(
        "Loaded {} parameter series for location {} ({} failed)",
        loaded.series.len(),
        location_id,
        loaded.failed.len()
    );
    loaded
}

/// Load one parameter's series at several locations, keyed by location id.
pub async fn load_comparison_series(
    client: &AirQualityClient,
    location_ids: &[i64],
    parameter_id: i64,
    limit: Option<u32>,
    options: &AggregateOptions,
) -> LoadedSeries {
    load_pages(
        client,
        location_ids,
        |id| *id,
        |id| MeasurementsQuery::series(*id, parameter_id, limit),
        options,
    )
    .await
}

/// Check which locations have data for a parameter, in input order.
///
/// Fetches at most one measurement per location and reads the upstream
/// total. A location whose check fails reports no data.
pub async fn check_availability(
    client: &AirQualityClient,
    location_ids: &[i64],
    parameter_id: i64,
    options: &AggregateOptions,
) -> Vec<Availability> {
    let loaded = load_pages(
        client,
        location_ids,
        |id| *id,
        |id| MeasurementsQuery::series(*id, parameter_id, Some(1)),
        options,
    )
    .await;

    let availability: Vec<Availability> = location_ids
        .iter()
        .map(|&id| Availability {
            location_id: id,
            has_data: loaded.series.get(&id).is_some_and(|s| !s.is_empty()),
            total: loaded.total(id),
        })
        .collect();

    tracing::debug!(
        "{} of {} locations have data for parameter {}",
        availability.iter().filter(|a| a.has_data).count(),
        availability.len(),
        parameter_id
    );
    availability
}
