use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

use crate::AppState;

// ═══════════════════════════════════════════════════════════════
//  Metric names
// ═══════════════════════════════════════════════════════════════

/// Counter, labels: `method`, `endpoint`, `status`.
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
/// Histogram в секундах, labels: `method`, `endpoint`.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Границы бакетов latency histogram.
pub const HTTP_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Prometheus builder с бакетами для [`HTTP_REQUEST_DURATION_SECONDS`]:
/// без них exporter отдаёт histogram как summary.
pub fn prometheus_builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_owned()),
        HTTP_DURATION_BUCKETS,
    )
}

/// Middleware на каждый route: считает запрос и его длительность.
///
/// `endpoint` это сырой path запроса (`/api/users/7`, не шаблон),
/// `status` это reason phrase (`OK`, `Not Found`).
pub(crate) async fn track_metrics(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let endpoint = req.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(req).await;

    let elapsed = started.elapsed().as_secs_f64();
    let code = response.status();
    let status = code
        .canonical_reason()
        .map(str::to_owned)
        .unwrap_or_else(|| code.as_str().to_owned());

    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.clone(),
        "endpoint" => endpoint.clone(),
        "status" => status
    )
    .increment(1);
    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method,
        "endpoint" => endpoint
    )
    .record(elapsed);

    response
}

// ═══════════════════════════════════════════════════════════════
//  GET /metrics
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}
