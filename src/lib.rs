use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
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

pub mod auth;
pub mod config;
pub mod error;
pub mod geocoder;
pub mod handlers;
pub mod models;
pub mod query;
pub mod repository;
pub mod storage;

// Routing split by access level (public, authenticated).
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use geocoder::{GeocoderState, MapQuestGeocoder, MockGeocoder};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{LocalStorageService, MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document aggregated from the `#[utoipa::path]` handlers and
/// `ToSchema` models, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_bootcamps, handlers::get_bootcamp, handlers::create_bootcamp,
        handlers::update_bootcamp, handlers::delete_bootcamp,
        handlers::get_bootcamps_in_radius, handlers::bootcamp_photo_upload
    ),
    components(
        schemas(
            models::Bootcamp, models::Location, models::CreateBootcampRequest,
            models::UpdateBootcampRequest, models::Pagination, models::PageLink,
            models::Role, models::User,
        )
    ),
    tags(
        (name = "devcamper", description = "DevCamper Bootcamp API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Single, cloneable container for every service a handler can reach.
/// All members are immutable or internally shared behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: bootcamps and users.
    pub repo: RepositoryState,
    /// Photo storage (local directory, S3, or mock).
    pub storage: StorageState,
    /// Address / postal code resolution.
    pub geocoder: GeocoderState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for GeocoderState {
    fn from_ref(app_state: &AppState) -> GeocoderState {
        app_state.geocoder.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 unless `AuthUser` can be extracted.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routes under `/api/v1`, the docs, the static uploads
/// directory (local env), and the request-id / tracing / CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let api = Router::new().merge(public::public_routes()).merge(
        authenticated::authenticated_routes(state.config.upload_body_limit()).route_layer(
            middleware::from_fn_with_state(state.clone(), auth_middleware),
        ),
    );

    let mut base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", axum::routing::get(|| async { "ok" }))
        .nest("/api/v1", api);

    // Photos written by the local storage backend are served as static files.
    if state.config.env == config::Env::Local {
        base_router = base_router.nest_service(
            "/uploads",
            ServeDir::new(&state.config.file_upload_path),
        );
    }

    base_router
        .with_state(state)
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
        .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer` carrying method, uri and the generated `x-request-id`,
/// so every log line of one request can be correlated.
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
