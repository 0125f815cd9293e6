pub mod aqi;
pub mod health;
pub mod locations;
pub mod reference;
pub mod trends;

use crate::services::aggregator::AggregateOptions;
use crate::services::upstream::AirQualityClient;

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: AirQualityClient,
    pub aggregate: AggregateOptions,
    /// Per-series measurement cap; `None` requests full history
    pub measurement_limit: Option<u32>,
}
