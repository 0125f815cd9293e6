//! Shared helpers for reading loosely-typed upstream values.
//!
//! The upstream API serializes numbers and timestamps inconsistently across
//! versions: values may be numbers, numeric strings or null, and timestamps
//! may be RFC 3339 or naive ISO 8601 without an offset.
//!
//! Both helpers return `None` rather than failing, so a single malformed
//! measurement never aborts a whole series.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Keep `v` only when it is finite.
pub(crate) fn finite(v: f64) -> Option<f64> {
    if v.is_finite() {
        Some(v)
    } else {
        tracing::debug!("dropping non-finite value {}", v);
        None
    }
}

/// Parse an upstream timestamp. Naive timestamps are taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .ok()
}

/// Serde adapter: number, numeric string, or anything else → `Option<f64>`.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().and_then(finite),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok().and_then(finite),
        _ => None,
    })
}

/// Serde adapter: timestamp string in any supported format → `Option<DateTime<Utc>>`.
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => parse_timestamp(&s),
        _ => None,
    })
}
