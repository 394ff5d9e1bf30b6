//! scribe-api - HTTP API for background transcription jobs.
//!
//! The binary in `main.rs` wires configuration, storage, and the worker pool
//! together and serves [`build_router`].

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use uuid::Uuid;

use scribe_jobs::{JobOutput, JobProgress, JobStatus, QueueStats};

pub use config::ServerConfig;
pub use error::ApiError;
pub use state::AppState;

/// Room for multipart boundaries and headers on top of the upload limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Scribe API",
        description = "Asynchronous file transcription jobs with progress polling"
    ),
    paths(
        handlers::jobs::submit_job,
        handlers::jobs::get_job,
        handlers::jobs::cancel_job,
        handlers::results::get_result,
        handlers::health::health_check,
    ),
    components(schemas(
        handlers::jobs::SubmitJobResponse,
        handlers::health::HealthResponse,
        JobProgress,
        JobStatus,
        JobOutput,
        QueueStats,
    )),
    tags(
        (name = "Jobs", description = "Job submission and progress"),
        (name = "Results", description = "Completed job output"),
        (name = "System", description = "Health and metadata"),
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the application router with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    let allow_origin = if state.config.allows_any_origin() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(state.config.allowed_origins())
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/openapi.json", get(openapi_json))
        .route("/api/v1/jobs", post(handlers::jobs::submit_job))
        .route("/api/v1/jobs/:id", get(handlers::jobs::get_job))
        .route("/api/v1/jobs/:id/cancel", post(handlers::jobs::cancel_job))
        .route(
            "/api/v1/results/:locator",
            get(handlers::results::get_result),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CatchPanicLayer::new())
                .layer(cors),
        )
        .with_state(state)
}
