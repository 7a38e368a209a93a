//! Router construction for both services
//!
//! Each service gets its own router. They share the health and metrics
//! endpoints and the same middleware stack: body limit, tracing and a
//! permissive CORS policy so the dashboard can call them from any origin.

use axum::{
    extract::DefaultBodyLimit,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::control::{self, ControlState};
use crate::api::summary::{self, SummaryState};
use crate::config::ServerConfig;
use crate::metrics::METRICS;
use crate::observability::HealthResponse;

pub const SUMMARY_SERVICE: &str = "summary-service";
pub const CONTROL_SERVICE: &str = "control-service";

/// Build the summary service router
pub fn build_summary_router(state: SummaryState, server: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/api/summarize", post(summary::summarize))
        .with_state(state);

    with_middleware(api.merge(common_routes(SUMMARY_SERVICE)), server)
}

/// Build the control service router
pub fn build_control_router(state: ControlState, server: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/control", post(control::control))
        .with_state(state);

    with_middleware(api.merge(common_routes(CONTROL_SERVICE)), server)
}

fn common_routes(service: &'static str) -> Router {
    Router::new()
        .route("/health", get(move || async move { Json(HealthResponse::ok(service)) }))
        .route("/metrics", get(export_metrics))
}

/// The body limit is enforced by the extractors so handlers can answer 413 in JSON
fn with_middleware(router: Router, server: &ServerConfig) -> Router {
    router
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer()),
        )
}

/// Cross-origin requests are accepted from anywhere
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// GET /metrics
async fn export_metrics() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.export_prometheus(),
    )
}
