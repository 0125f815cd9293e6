// Air Quality Dashboard API v0.1
use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use airq_dashboard_api::config::AppConfig;
use airq_dashboard_api::routes::{self, AppState};
use airq_dashboard_api::services::aggregator::AggregateOptions;
use airq_dashboard_api::services::upstream::AirQualityClient;
use airq_dashboard_api::{errors, models, services};

/// OpenAPI document for the dashboard API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Air Quality Dashboard API",
        version = "0.1.0",
        description = "Dashboard backend over an upstream air quality API. \
            Groups monitoring locations by metro area, classifies AQI readings, \
            and fans out concurrent measurement fetches for location detail and \
            multi-location trend comparison, summarizing each series.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Locations", description = "Location listing, search and detail"),
        (name = "Trends", description = "Multi-location series comparison"),
        (name = "Reference", description = "Parameters and overview statistics"),
        (name = "AQI", description = "AQI severity classification"),
    ),
    paths(
        routes::health::health_check,
        routes::locations::list_locations,
        routes::locations::search_locations,
        routes::locations::get_location,
        routes::trends::get_trends,
        routes::trends::get_availability,
        routes::reference::list_parameters,
        routes::reference::get_stats,
        routes::aqi::classify_aqi,
        routes::aqi::list_categories,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::locations::LocationView,
            routes::locations::LocationGroupView,
            routes::locations::LocationListResponse,
            routes::locations::SeriesView,
            routes::locations::ParameterSeries,
            routes::locations::LocationDetailResponse,
            routes::trends::TrendSeries,
            routes::trends::TrendsResponse,
            services::dashboard::Availability,
            routes::aqi::AqiResponse,
            services::aqi::AqiCategory,
            services::summary::SeriesSummary,
            models::Parameter,
            models::Sensor,
            models::Measurement,
            models::Stats,
            models::ParameterCount,
            models::CountryCount,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airq_dashboard_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    let client = AirQualityClient::new(
        &config.upstream_api_url,
        config.fetch_timeout,
        config.parameter_cache_ttl,
    )
    .expect("Failed to build upstream API client");

    tracing::info!("Using upstream air quality API at {}", config.upstream_api_url);

    let app_state = AppState {
        client,
        aggregate: AggregateOptions {
            max_in_flight: config.max_concurrent_fetches,
            timeout: config.fetch_timeout,
            retries: config.fetch_retries,
            ..AggregateOptions::default()
        },
        measurement_limit: config.measurement_limit,
    };

    // CORS: read-only API, restrict methods to GET
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/locations", get(routes::locations::list_locations))
        .route(
            "/api/v1/locations/search",
            get(routes::locations::search_locations),
        )
        .route("/api/v1/locations/:id", get(routes::locations::get_location))
        .route("/api/v1/trends", get(routes::trends::get_trends))
        .route(
            "/api/v1/trends/availability",
            get(routes::trends::get_availability),
        )
        .route("/api/v1/parameters", get(routes::reference::list_parameters))
        .route("/api/v1/stats", get(routes::reference::get_stats))
        .with_state(app_state);

    // AQI classification is pure and needs no state
    let aqi_routes = Router::new()
        .route("/api/v1/aqi", get(routes::aqi::classify_aqi))
        .route("/api/v1/aqi/categories", get(routes::aqi::list_categories));

    let app = Router::new()
        .merge(api_routes)
        .merge(aqi_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
