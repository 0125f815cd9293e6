//! AQI gauge endpoints.
//!
//! - GET /api/v1/aqi?value=N
//! - GET /api/v1/aqi/categories

use axum::extract::Query;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::services::aqi::{categories, classify, AqiCategory};

#[derive(Debug, Deserialize, IntoParams)]
pub struct AqiQuery {
    /// AQI value to classify; omit for the "N/A" category
    pub value: Option<f64>,
}

/// Classification of a single AQI value.
#[derive(Debug, Serialize, ToSchema)]
pub struct AqiResponse {
    pub value: Option<f64>,
    pub category: AqiCategory,
    /// Scale maximum used by the gauge (500)
    pub scale_max: f64,
}

const AQI_SCALE_MAX: f64 = 500.0;

/// Classify an AQI value into its severity category.
#[utoipa::path(
    get,
    path = "/api/v1/aqi",
    tag = "AQI",
    params(AqiQuery),
    responses(
        (status = 200, description = "Severity category for the value", body = AqiResponse),
    )
)]
pub async fn classify_aqi(Query(params): Query<AqiQuery>) -> Json<AqiResponse> {
    Json(AqiResponse {
        value: params.value,
        category: *classify(params.value),
        scale_max: AQI_SCALE_MAX,
    })
}

/// List the AQI severity categories, least to most severe.
#[utoipa::path(
    get,
    path = "/api/v1/aqi/categories",
    tag = "AQI",
    responses(
        (status = 200, description = "Ordered AQI categories", body = Vec<AqiCategory>),
    )
)]
pub async fn list_categories() -> Json<Vec<AqiCategory>> {
    Json(categories().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_classify_handler() {
        let Json(resp) = classify_aqi(Query(AqiQuery { value: Some(120.0) })).await;
        assert_eq!(resp.category.label, "Unhealthy for Sensitive Groups");

        let Json(resp) = classify_aqi(Query(AqiQuery { value: None })).await;
        assert_eq!(resp.category.label, "N/A");
    }

    #[tokio::test]
    async fn test_list_categories_handler() {
        let Json(list) = list_categories().await;
        assert_eq!(list.len(), 6);
        assert_eq!(list[0].label, "Good");
    }
}
