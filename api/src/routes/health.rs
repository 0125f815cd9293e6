use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use super::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status ("ok" when healthy, "degraded" when the upstream API is unreachable)
    pub status: String,
    /// API version
    pub version: String,
    /// Whether the upstream air quality API answered
    pub upstream: bool,
}

impl HealthResponse {
    fn from_upstream(upstream_ok: bool) -> Self {
        Self {
            status: if upstream_ok {
                "ok".to_string()
            } else {
                "degraded".to_string()
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            upstream: upstream_ok,
        }
    }
}

/// Health check endpoint.
///
/// Probes the upstream stats endpoint. Returns status "degraded" (still 200)
/// if the upstream is unreachable, so load balancers can distinguish partial
/// failures.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let upstream_ok = match state.client.get_stats().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Health check: upstream unavailable: {}", e);
            false
        }
    };
    Json(HealthResponse::from_upstream(upstream_ok))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        let ok = HealthResponse::from_upstream(true);
        assert_eq!(ok.status, "ok");
        assert!(ok.upstream);
        let degraded = HealthResponse::from_upstream(false);
        assert_eq!(degraded.status, "degraded");
        assert_eq!(degraded.version, env!("CARGO_PKG_VERSION"));
    }
}
