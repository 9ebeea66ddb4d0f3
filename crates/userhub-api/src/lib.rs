//! # userhub-api: Administrative User API
//!
//! Axum service exposing admin routes over users linked to social-app
//! accounts (twitter, facebook, google). Routes are declared against a small
//! path-pattern registry and served by one catch-all under `/api/v1`.
//!
//! ## API Surface
//!
//! | Path                  | Module                 | Auth |
//! |-----------------------|------------------------|------|
//! | `/api/v1/user/*`      | [`routes::users`]      | yes  |
//! | `/health/*`           | this module            | no   |
//! | `/metrics`            | [`middleware::metrics`]| no   |
//! | `/openapi.json`       | [`openapi`]            | no   |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → registry dispatch
//! ```

pub mod auth;
pub mod db;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::http::{header, StatusCode};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};

use crate::auth::AuthConfig;
use crate::middleware::metrics::{prometheus_handle, ApiMetrics, MetricsSnapshot};
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes, metrics and the OpenAPI document are mounted outside the
/// auth middleware so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();
    // Install the recorder before the first request is counted.
    let _ = prometheus_handle();

    // Authenticated API routes.
    let api = routes::router()
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(Extension(auth_config))
        .layer(Extension(metrics.clone()));

    // Unauthenticated probes and documents.
    let public = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(metrics_json))
        .route("/metrics/prometheus", get(metrics_prometheus))
        .merge(openapi::router())
        .layer(Extension(metrics));

    Router::new().merge(public).merge(api).with_state(state)
}

/// Liveness probe. Always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. Returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}

/// GET /metrics: request and error counters for the API routes.
async fn metrics_json(Extension(metrics): Extension<ApiMetrics>) -> Json<MetricsSnapshot> {
    Json(metrics.snapshot())
}

/// GET /metrics/prometheus: Prometheus text exposition.
async fn metrics_prometheus() -> impl IntoResponse {
    match prometheus_handle() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
