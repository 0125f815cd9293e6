use std::str::FromStr;
use std::time::Duration;

use crate::services::aggregator::{
    DEFAULT_FETCH_RETRIES, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_IN_FLIGHT,
};

/// Default base URL of the upstream air quality API.
const DEFAULT_UPSTREAM_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_PORT: u16 = 8080;
/// Parameters rarely change upstream; cache them for an hour.
const DEFAULT_PARAMETER_CACHE_TTL_SECS: u64 = 3600;

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub upstream_api_url: String,
    pub port: u16,
    /// Per-request timeout for upstream calls.
    pub fetch_timeout: Duration,
    /// Cap on concurrent per-entity series fetches.
    pub max_concurrent_fetches: usize,
    pub fetch_retries: u32,
    /// Upper bound on measurements per series. `None` fetches all history.
    pub measurement_limit: Option<u32>,
    pub parameter_cache_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            upstream_api_url: std::env::var("UPSTREAM_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_UPSTREAM_API_URL.to_string()),
            port: env_or("PORT", DEFAULT_PORT),
            fetch_timeout: Duration::from_secs(
                env_or("FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT.as_secs()).max(1),
            ),
            max_concurrent_fetches: env_or("MAX_CONCURRENT_FETCHES", DEFAULT_MAX_IN_FLIGHT)
                .max(1),
            fetch_retries: env_or("FETCH_RETRIES", DEFAULT_FETCH_RETRIES),
            measurement_limit: std::env::var("MEASUREMENT_LIMIT")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|&limit| limit > 0),
            parameter_cache_ttl: Duration::from_secs(env_or(
                "PARAMETER_CACHE_TTL_SECS",
                DEFAULT_PARAMETER_CACHE_TTL_SECS,
            )),
        }
    }
}

/// Read and parse an env var, falling back to `default` when unset or invalid.
fn env_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("{} has invalid value '{}', using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        // set_var/remove_var race with other tests reading the environment;
        // only this test touches these keys.
        unsafe {
            std::env::remove_var("UPSTREAM_API_URL");
            std::env::remove_var("PORT");
            std::env::remove_var("FETCH_TIMEOUT_SECS");
            std::env::remove_var("MAX_CONCURRENT_FETCHES");
            std::env::remove_var("FETCH_RETRIES");
            std::env::remove_var("MEASUREMENT_LIMIT");
            std::env::remove_var("PARAMETER_CACHE_TTL_SECS");
        }

        let config = AppConfig::from_env();

        assert_eq!(config.port, 8080);
        assert_eq!(config.upstream_api_url, "http://localhost:5000/api");
        assert_eq!(config.fetch_timeout, Duration::from_secs(15));
        assert_eq!(config.max_concurrent_fetches, 20);
        assert_eq!(config.fetch_retries, 1);
        assert_eq!(
            config.fetch_retries,
            crate::services::aggregator::AggregateOptions::default().retries
        );
        assert_eq!(config.measurement_limit, None);
        assert_eq!(config.parameter_cache_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_env_or_invalid_falls_back() {
        unsafe {
            std::env::set_var("AIRQ_TEST_ENV_OR", "not-a-number");
        }
        assert_eq!(env_or("AIRQ_TEST_ENV_OR", 42u16), 42);
        unsafe {
            std::env::set_var("AIRQ_TEST_ENV_OR", " 7 ");
        }
        assert_eq!(env_or("AIRQ_TEST_ENV_OR", 42u16), 7);
    }
}
