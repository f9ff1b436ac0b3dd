use axum::{
    extract::{FromRef, Request},
    http::{HeaderName, StatusCode},
    Router,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod repository;
pub mod storage;
pub mod uploads;

// Routing split by access level (public, admin).
pub mod routes;
use routes::{admin, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use rate_limit::RateLimitState;
pub use repository::{RepositoryState, SqliteRepository};
pub use storage::{DiskImageStore, ImageStoreState};

/// ApiDoc
///
/// OpenAPI document for the service, served at `/api-docs/openapi.json`
/// with a Swagger UI at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::ping, handlers::submit_enrollment,
        handlers::list_students, handlers::delete_student
    ),
    components(
        schemas(
            models::EnrollmentRecord, models::SubmitResponse,
            models::DeleteResponse, models::ErrorResponse,
        )
    ),
    tags(
        (name = "enrollment-intake", description = "Student enrollment intake API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The process-wide context shared by every request: the record store, the
/// image store, the loaded configuration and the rate limiter counters.
/// Cloning is cheap; every field is a shared handle.
#[derive(Clone)]
pub struct AppState {
    /// Record store for enrollment rows.
    pub repo: RepositoryState,
    /// Content directory for uploaded images.
    pub images: ImageStoreState,
    /// Immutable configuration loaded at startup.
    pub config: AppConfig,
    /// Per-address request quota.
    pub limits: RateLimitState,
}

impl AppState {
    /// Assembles the state, sizing the rate limiter from the configuration.
    pub fn new(repo: RepositoryState, images: ImageStoreState, config: AppConfig) -> Self {
        let limits = RateLimitState::new(config.rate_limit_max, config.rate_limit_window);
        Self {
            repo,
            images,
            config,
            limits,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// Let handlers and extractors pull only the component they need.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for ImageStoreState {
    fn from_ref(app_state: &AppState) -> ImageStoreState {
        app_state.images.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for RateLimitState {
    fn from_ref(app_state: &AppState) -> RateLimitState {
        app_state.limits.clone()
    }
}

/// reject_hidden_paths
///
/// 404s any path with a dot-prefixed segment, literal or percent-encoded, so
/// files like `.env` in the static root are never served.
async fn reject_hidden_paths(request: Request, next: Next) -> Response {
    let hidden = request.uri().path().split('/').any(|segment| {
        segment.starts_with('.')
            || segment
                .get(..3)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("%2e"))
    });

    if hidden {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

/// create_router
///
/// Assembles the routes, the static file fallback, and the global middleware.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Static files: the configured root (by default the working directory,
    // which includes the uploads directory) is served under "/". Dotfiles are
    // filtered out by `reject_hidden_paths`.
    let static_files = ServeDir::new(&state.config.static_dir);

    // 3. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .nest("/api", admin::admin_routes())
        .fallback_service(static_files)
        .layer(middleware::from_fn(reject_hidden_paths))
        // Every request, static files included, counts against the quota.
        .layer(middleware::from_fn_with_state(
            state.limits.clone(),
            rate_limit::rate_limit_middleware,
        ))
        .with_state(state);

    // 4. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 5. CORS Layer (outermost)
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span, tagging it with the `x-request-id` assigned
/// by `SetRequestIdLayer` so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
