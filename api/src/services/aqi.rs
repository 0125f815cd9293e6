//! AQI severity classification.
//!
//! The six US EPA tiers with inclusive upper bounds, plus the PM2.5
//! concentration → AQI interpolation used when a location has no AQI of its
//! own.

use serde::Serialize;
use utoipa::ToSchema;

use crate::helpers::finite;
use crate::models::Location;

/// A severity tier of the AQI scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct AqiCategory {
    /// 0 for unknown, 1 (Good) through 6 (Hazardous)
    pub level: u8,
    #[schema(value_type = String)]
    pub label: &'static str,
    /// CSS color for the gauge
    #[schema(value_type = String)]
    pub color: &'static str,
    /// Inclusive upper bound; null for the unknown category
    pub upper_bound: Option<f64>,
}

/// Returned for absent or non-numeric AQI values.
pub const UNKNOWN: AqiCategory = AqiCategory {
    level: 0,
    label: "N/A",
    color: "rgba(156, 163, 175, 1)",
    upper_bound: None,
};

const CATEGORIES: [AqiCategory; 6] = [
    AqiCategory {
        level: 1,
        label: "Good",
        color: "rgba(0, 228, 0, 1)",
        upper_bound: Some(50.0),
    },
    AqiCategory {
        level: 2,
        label: "Moderate",
        color: "rgba(255, 255, 0, 1)",
        upper_bound: Some(100.0),
    },
    AqiCategory {
        level: 3,
        label: "Unhealthy for Sensitive Groups",
        color: "rgba(255, 126, 0, 1)",
        upper_bound: Some(150.0),
    },
    AqiCategory {
        level: 4,
        label: "Unhealthy",
        color: "rgba(255, 0, 0, 1)",
        upper_bound: Some(200.0),
    },
    AqiCategory {
        level: 5,
        label: "Very Unhealthy",
        color: "rgba(143, 63, 151, 1)",
        upper_bound: Some(300.0),
    },
    AqiCategory {
        level: 6,
        label: "Hazardous",
        color: "rgba(126, 0, 35, 1)",
        upper_bound: Some(500.0),
    },
];

/// The ordered tier table, least to most severe.
pub fn categories() -> &'static [AqiCategory] {
    &CATEGORIES
}

/// Classify an AQI value. Total: never panics for any input.
///
/// Values above the nominal 500 ceiling still classify as Hazardous;
/// negative values classify as Good.
pub fn classify(aqi: Option<f64>) -> &'static AqiCategory {
    let Some(value) = aqi.and_then(finite) else {
        return &UNKNOWN;
    };
    CATEGORIES
        .iter()
        .find(|c| c.upper_bound.is_some_and(|bound| value <= bound))
        .unwrap_or(&CATEGORIES[CATEGORIES.len() - 1])
}

/// EPA PM2.5 breakpoints: (conc_low, conc_high, aqi_low, aqi_high).
const PM25_BREAKPOINTS: [(f64, f64, f64, f64); 7] = [
    (0.0, 12.0, 0.0, 50.0),
    (12.1, 35.4, 51.0, 100.0),
    (35.5, 55.4, 101.0, 150.0),
    (55.5, 150.4, 151.0, 200.0),
    (150.5, 250.4, 201.0, 300.0),
    (250.5, 350.4, 301.0, 400.0),
    (350.5, 500.4, 401.0, 500.0),
];

/// Convert a PM2.5 concentration (µg/m³) to an AQI value.
///
/// The concentration is truncated to 0.1 µg/m³ first, so values between
/// two breakpoint rows (e.g. 12.05) land in the lower row. Returns `None`
/// for negative, non-finite or off-scale (> 500.4) input.
pub fn pm25_to_aqi(concentration: f64) -> Option<u32> {
    if !concentration.is_finite() || concentration < 0.0 {
        return None;
    }
    // Round before flooring so 12.1 (stored as 12.0999...) stays 12.1.
    let truncated = ((concentration * 10.0 + 1e-9).floor()) / 10.0;

    PM25_BREAKPOINTS
        .iter()
        .find(|(lo, hi, _, _)| truncated >= *lo - 1e-9 && truncated <= *hi + 1e-9)
        .map(|&(c_lo, c_hi, i_lo, i_hi)| {
            let aqi = (i_hi - i_lo) / (c_hi - c_lo) * (truncated - c_lo) + i_lo;
            aqi.round() as u32
        })
}

/// Current AQI for a location: the upstream figure when usable, otherwise
/// derived from the location's PM2.5 sensor.
pub fn location_aqi(location: &Location) -> Option<f64> {
    if let Some(aqi) = location.aqi.and_then(finite) {
        return Some(aqi);
    }
    location
        .parameter_sensors()
        .find(|(_, p)| p.name == "pm25")
        .and_then(|(s, _)| s.last_value)
        .and_then(pm25_to_aqi)
        .map(f64::from)
}
