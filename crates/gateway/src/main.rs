//! Mosaic API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Story submission and retrieval
//! - Curriculum generation
//! - Observability (logging, metrics, tracing)

mod extract;
mod handlers;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use mosaic_common::{
    config::{AppConfig, ObservabilityConfig},
    curriculum::CurriculumService,
    db::{DbPool, Repository, StoryStore},
    geocode::{Geocoder, NominatimGeocoder},
    metrics,
    storage::SupabaseStore,
    ObjectStore,
};
use mosaic_ingestion::IngestionOrchestrator;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub store: Arc<dyn StoryStore>,
    pub geocoder: Arc<dyn Geocoder>,
    /// Absent when no generation API key is configured; the endpoint
    /// then answers with a configuration error instead of failing boot
    pub curriculum: Option<Arc<CurriculumService>>,
    pub ingestion: Arc<IngestionOrchestrator>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    // Initialize tracing
    init_tracing(&config.observability);

    info!("Starting Mosaic API Gateway v{}", mosaic_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
    }
    metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    let repository = Arc::new(Repository::new(db.clone()));
    let store: Arc<dyn StoryStore> = repository;

    // Curriculum generation is optional at boot; requests fail with a
    // configuration error until a key is provided
    let curriculum = match mosaic_common::generation::create_generator(&config.generation) {
        Ok(generator) => Some(Arc::new(CurriculumService::new(generator, store.clone()))),
        Err(e) => {
            warn!(error = %e, "Curriculum generation disabled");
            None
        }
    };

    // Unconfigured storage still boots; every upload then resolves to an
    // absent locator, which the pipeline absorbs
    let object_store: Arc<dyn ObjectStore> = Arc::new(SupabaseStore::new(
        config.storage.base_url.clone().unwrap_or_default(),
        config.storage.service_key.clone().unwrap_or_default(),
    ));

    let geocoder: Arc<dyn Geocoder> = Arc::new(NominatimGeocoder::new(
        config.geocoding.base_url.clone(),
        &config.geocoding.user_agent,
    ));

    let ingestion = Arc::new(IngestionOrchestrator::new(
        geocoder.clone(),
        object_store,
        store.clone(),
        config.storage.clone(),
    ));

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        store,
        geocoder,
        curriculum,
        ingestion,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Curriculum generation (path kept stable for existing clients)
        .route(
            "/api/generate-curriculum",
            post(handlers::curriculum::generate),
        )
        // Story endpoints
        .route("/v1/stories", post(handlers::stories::submit_story))
        .route("/v1/stories", get(handlers::stories::list_stories))
        .route("/v1/stories/{id}", get(handlers::stories::get_story))
        .route("/v1/stories/{id}", delete(handlers::stories::delete_story))
        // Place lookups backing the upload form
        .route("/v1/geocode", get(handlers::geocode::forward))
        .route("/v1/geocode/reverse", get(handlers::geocode::reverse))
        .layer(middleware::from_fn(track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Per-request counter and latency histogram
async fn track_metrics(request: Request, next: Next) -> Response {
    let tracker = metrics::RequestMetrics::start(request.method().as_str(), request.uri().path());
    let response = next.run(request).await;
    tracker.finish(response.status().as_u16());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use mosaic_common::db::MemoryStoryStore;
    use mosaic_common::errors::ErrorResponse;
    use tower::ServiceExt;

    fn router() -> Router {
        create_router(handlers::testing::app_state(
            Arc::new(MemoryStoryStore::new()),
            None,
        ))
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, ErrorResponse) {
        let response = app
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_mistyped_json_field_answers_contract_400() {
        // a number where a string belongs is still a client error with
        // the flat body, not a framework rejection
        let (status, body) = post_json(
            router(),
            "/api/generate-curriculum",
            r#"{"storyId": 42, "title": "T", "excerpt": "E", "culture": "C"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Invalid request body");
        assert!(body.details.is_some());
    }

    #[tokio::test]
    async fn test_malformed_json_syntax_answers_contract_400() {
        let (status, body) =
            post_json(router(), "/api/generate-curriculum", "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Invalid request body");
    }

    #[tokio::test]
    async fn test_story_submission_body_shares_the_rejection_contract() {
        let (status, body) =
            post_json(router(), "/v1/stories", r#"{"title": 7}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Invalid request body");
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
