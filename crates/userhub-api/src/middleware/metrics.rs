//! # Request Metrics
//!
//! In-process atomic counters served as JSON at `/metrics`, mirrored into
//! the `metrics` facade so a Prometheus scrape at `/metrics/prometheus`
//! sees per-method, per-status series and a latency histogram.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use utoipa::ToSchema;

/// Shared metrics state.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    request_count: Arc<AtomicU64>,
    error_count: Arc<AtomicU64>,
}

/// Point-in-time view of [`ApiMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub errors: u64,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return current request count.
    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Return current error count (4xx and 5xx responses).
    pub fn errors(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests(),
            errors: self.errors(),
        }
    }

    fn record(&self, is_error: bool) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        if is_error {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Process-wide Prometheus recorder.
///
/// Installed on first use. `None` if another global recorder was installed
/// first, in which case only the JSON counters are available.
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "prometheus recorder not installed");
                None
            }
        })
        .as_ref()
}

/// Middleware that increments request and error counters.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let is_error = status.is_client_error() || status.is_server_error();
    if let Some(m) = metrics {
        m.record(is_error);
    }

    metrics::counter!(
        "userhub_http_requests_total",
        "method" => method,
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!("userhub_http_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());

    response
}
