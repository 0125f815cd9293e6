//! Summary statistics over a single measurement series.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::helpers::finite;
use crate::models::Measurement;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Display statistics for one series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct SeriesSummary {
    /// Value of the newest measurement (index 0, newest-first convention)
    pub latest: Option<f64>,
    /// Mean of all usable values
    pub average: Option<f64>,
    /// Days between the oldest and newest timestamps; 0 for a single point
    pub span_days: Option<f64>,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    /// Number of measurements in the series, usable or not
    pub count: usize,
}

/// Summarize a newest-first series.
///
/// Entries without a usable value are left out of the average, and entries
/// without a timestamp are left out of the span; neither aborts the summary.
/// The span is taken from the min/max timestamps, never from array order.
pub fn summarize(series: &[Measurement]) -> SeriesSummary {
    let Some(first) = series.first() else {
        return SeriesSummary::default();
    };

    let (sum, n) = series
        .iter()
        .filter_map(|m| m.value.and_then(finite))
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    let average = (n > 0).then(|| sum / n as f64);

    let timestamps = series.iter().filter_map(|m| m.timestamp);
    let oldest = timestamps.clone().min();
    let newest = timestamps.max();

    let span_days = match (oldest, newest) {
        (Some(lo), Some(hi)) if series.len() > 1 => {
            Some((hi - lo).num_seconds() as f64 / SECONDS_PER_DAY)
        }
        _ => Some(0.0),
    };

    SeriesSummary {
        latest: first.value.and_then(finite),
        average,
        span_days,
        oldest,
        newest,
        count: series.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_series() {
        let s = summarize(&[]);
        assert_eq!(s.latest, None);
        assert_eq!(s.average, None);
        assert_eq!(s.span_days, None);
        assert_eq!(s.count, 0);
    }

    #[test]
    fn test_single_measurement() {
        let s = summarize(&[Measurement::new(10.0, t0())]);
        assert_eq!(s.latest, Some(10.0));
        assert_eq!(s.average, Some(10.0));
        assert_eq!(s.span_days, Some(0.0));
        assert_eq!(s.oldest, Some(t0()));
        assert_eq!(s.newest, Some(t0()));
    }

    #[test]
    fn test_two_measurements_newest_first() {
        let series = [
            Measurement::new(10.0, t0() + Duration::days(2)),
            Measurement::new(20.0, t0()),
        ];
        let s = summarize(&series);
        assert_eq!(s.latest, Some(10.0));
        assert_eq!(s.average, Some(15.0));
        assert_eq!(s.span_days, Some(2.0));
    }

    #[test]
    fn test_span_uses_min_max_not_array_order() {
        // Out of order: the oldest point sits in the middle.
        let series = [
            Measurement::new(1.0, t0() + Duration::days(1)),
            Measurement::new(2.0, t0()),
            Measurement::new(3.0, t0() + Duration::days(3)),
        ];
        let s = summarize(&series);
        assert_eq!(s.span_days, Some(3.0));
        assert_eq!(s.oldest, Some(t0()));
        assert_eq!(s.newest, Some(t0() + Duration::days(3)));
    }

    #[test]
    fn test_fractional_span() {
        let series = [
            Measurement::new(1.0, t0() + Duration::hours(12)),
            Measurement::new(1.0, t0()),
        ];
        assert_eq!(summarize(&series).span_days, Some(0.5));
    }

    #[test]
    fn test_missing_values_excluded_from_average() {
        let mut broken = Measurement::new(0.0, t0() + Duration::days(1));
        broken.value = None;
        let series = [
            broken,
            Measurement::new(4.0, t0()),
            Measurement::new(f64::NAN, t0()),
            Measurement::new(8.0, t0()),
        ];
        let s = summarize(&series);
        assert_eq!(s.latest, None);
        assert_eq!(s.average, Some(6.0));
        assert_eq!(s.span_days, Some(1.0));
        assert_eq!(s.count, 4);
    }

    #[test]
    fn test_no_usable_values() {
        let mut m = Measurement::new(0.0, t0());
        m.value = None;
        let s = summarize(&[m.clone(), m]);
        assert_eq!(s.average, None);
        assert_eq!(s.span_days, Some(0.0));
    }

    #[test]
    fn test_missing_timestamps_span_zero() {
        let mut a = Measurement::new(1.0, t0());
        a.timestamp = None;
        let b = Measurement::new(3.0, t0());
        let s = summarize(&[a, b]);
        assert_eq!(s.span_days, Some(0.0));
        assert_eq!(s.average, Some(2.0));
    }
}
