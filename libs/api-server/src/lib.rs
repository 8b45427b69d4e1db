mod error;
mod http;
mod http_metrics;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;

use async_sink::AsyncSink;
use user_registry::Registry;

pub use error::{ApiError, ServeError};
pub use http::validate_user;
pub use http_metrics::{
    HTTP_DURATION_BUCKETS, HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL, prometheus_builder,
};

/// Общее состояние handler'ов: registry, два sink'а и handle
/// Prometheus recorder'а для `/metrics`.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub audit: Arc<AsyncSink>,
    pub notify: Arc<AsyncSink>,
    pub metrics: PrometheusHandle,
}

/// Router пользовательского API без привязки к сокету.
///
/// Метрики запросов пишутся в текущий `metrics` recorder.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::handle_health))
        .route("/metrics", get(http_metrics::handle_metrics))
        .route("/api/users", get(http::handle_list).post(http::handle_create))
        .route(
            "/api/users/{id}",
            get(http::handle_get)
                .put(http::handle_update)
                .delete(http::handle_delete),
        )
        .layer(middleware::from_fn(http_metrics::track_metrics))
        .with_state(state)
}

/// HTTP API сервер. Завершается по `shutdown`.
pub async fn run(port: u16, state: AppState, shutdown: CancellationToken) -> Result<(), ServeError> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServeError::Bind { addr: addr.clone(), source })?;

    tracing::info!(%addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(ServeError::Serve)
}
