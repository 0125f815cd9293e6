//! Read-only views over upstream API responses.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::helpers::{lenient_f64, lenient_timestamp};

/// A measured pollutant or quantity (e.g. `pm25`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Parameter {
    pub id: i64,
    /// Machine name (e.g. "pm25")
    pub name: String,
    /// Display name (e.g. "PM2.5")
    #[serde(default)]
    pub display_name: String,
    /// Unit string (e.g. "µg/m³")
    #[serde(default)]
    pub unit: String,
}

/// A sensor mounted at a location, measuring one parameter.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Sensor {
    pub id: i64,
    #[serde(default)]
    pub openaq_id: Option<i64>,
    #[serde(default)]
    pub parameter: Option<Parameter>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub last_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// A monitoring location.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Location {
    pub id: i64,
    #[serde(default)]
    pub openaq_id: Option<i64>,
    pub name: String,
    /// Metro area / locality; free text, used for grouping only
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub is_mobile: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Current AQI as reported upstream
    #[serde(default, deserialize_with = "lenient_f64")]
    pub aqi: Option<f64>,
    /// Search results omit sensors
    #[serde(default)]
    pub sensors: Vec<Sensor>,
}

impl Location {
    /// Sensors that reference a parameter; the rest carry no plottable data.
    pub fn parameter_sensors(&self) -> impl Iterator<Item = (&Sensor, &Parameter)> {
        self.sensors
            .iter()
            .filter_map(|s| s.parameter.as_ref().map(|p| (s, p)))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct IdRef {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct RawMeasurement {
    #[serde(default, deserialize_with = "lenient_f64")]
    value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    sensor: Option<IdRef>,
    #[serde(default)]
    parameter: Option<IdRef>,
    #[serde(default)]
    location: Option<IdRef>,
}

/// A single timestamped reading.
///
/// `value` and `timestamp` are `None` when the upstream sent something
/// unusable; such entries are kept so the series length stays faithful, and
/// are skipped by the summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(from = "RawMeasurement")]
pub struct Measurement {
    pub value: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub sensor_id: Option<i64>,
    pub parameter_id: Option<i64>,
    pub location_id: Option<i64>,
}

impl From<RawMeasurement> for Measurement {
    fn from(raw: RawMeasurement) -> Self {
        Self {
            value: raw.value,
            timestamp: raw.timestamp,
            sensor_id: raw.sensor.map(|r| r.id),
            parameter_id: raw.parameter.map(|r| r.id),
            location_id: raw.location.map(|r| r.id),
        }
    }
}

impl Measurement {
    pub fn new(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            value: Some(value),
            timestamp: Some(timestamp),
            sensor_id: None,
            parameter_id: None,
            location_id: None,
        }
    }
}

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PageMeta {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
}

/// A page of upstream results.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub meta: PageMeta,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            meta: PageMeta::default(),
        }
    }
}

impl<T> Page<T> {
    /// Total matches upstream, falling back to the page length when the
    /// upstream omits it.
    pub fn total(&self) -> u64 {
        self.meta.total.unwrap_or(self.results.len() as u64)
    }
}

/// Measurement count per parameter, as reported by the stats endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParameterCount {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub measurement_count: u64,
}

/// Location count per country.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CountryCount {
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub location_count: u64,
}

/// Aggregate upstream counts for the dashboard header.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Stats {
    pub location_count: u64,
    pub sensor_count: u64,
    pub parameter_count: u64,
    pub measurement_count: u64,
    /// Measurements in the last 7 days
    pub recent_measurement_count: u64,
    /// Sensors reporting in the last 7 days
    pub active_sensors: u64,
    pub parameter_distribution: Vec<ParameterCount>,
    pub country_distribution: Vec<CountryCount>,
}

/// Series keyed by entity (parameter id or location id). Built fresh per
/// aggregation call.
pub type SeriesMap<K> = HashMap<K, Vec<Measurement>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_from_upstream_shape() {
        let json = r#"{
            "id": 9,
            "value": 14.2,
            "timestamp": "2024-05-01T08:00:00",
            "sensor": {"id": 3, "openaq_id": 77},
            "parameter": {"id": 2, "name": "pm25", "display_name": "PM2.5", "unit": "µg/m³"},
            "location": {"id": 5, "name": "Downtown", "latitude": 1.0, "longitude": 2.0}
        }"#;
        let m: Measurement = serde_json::from_str(json).unwrap();
        assert_eq!(m.value, Some(14.2));
        assert!(m.timestamp.is_some());
        assert_eq!(m.sensor_id, Some(3));
        assert_eq!(m.parameter_id, Some(2));
        assert_eq!(m.location_id, Some(5));
    }

    #[test]
    fn test_measurement_with_bad_value_still_parses() {
        let m: Measurement =
            serde_json::from_str(r#"{"value": "--", "timestamp": "not a date"}"#).unwrap();
        assert_eq!(m.value, None);
        assert_eq!(m.timestamp, None);
    }

    #[test]
    fn test_location_without_sensors() {
        let json = r#"{"id": 1, "name": "Park", "latitude": 29.7, "longitude": -95.3}"#;
        let loc: Location = serde_json::from_str(json).unwrap();
        assert!(loc.sensors.is_empty());
        assert_eq!(loc.locality, None);
        assert_eq!(loc.aqi, None);
    }

    #[test]
    fn test_parameter_sensors_skips_orphans() {
        let json = r#"{
            "id": 1, "name": "Park", "latitude": 0.0, "longitude": 0.0,
            "sensors": [
                {"id": 1, "parameter": {"id": 2, "name": "pm25"}, "last_value": 8.0},
                {"id": 2, "parameter": null}
            ]
        }"#;
        let loc: Location = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = loc.parameter_sensors().map(|(_, p)| p.name.as_str()).collect();
        assert_eq!(names, vec!["pm25"]);
    }

    #[test]
    fn test_page_total_prefers_upstream_meta() {
        let page: Page<Measurement> = serde_json::from_str(
            r#"{"results": [{"value": 1.0}], "meta": {"total": 4312, "limit": 1}}"#,
        )
        .unwrap();
        assert_eq!(page.total(), 4312);

        let page: Page<Measurement> =
            serde_json::from_str(r#"{"results": [{"value": 1.0}, {"value": 2.0}]}"#).unwrap();
        assert_eq!(page.total(), 2);
        assert_eq!(Page::<Measurement>::default().total(), 0);
    }

    #[test]
    fn test_stats_defaults_missing_fields() {
        let stats: Stats = serde_json::from_str(r#"{"location_count": 12}"#).unwrap();
        assert_eq!(stats.location_count, 12);
        assert_eq!(stats.measurement_count, 0);
        assert!(stats.parameter_distribution.is_empty());
    }
}
