use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;

use async_sink::{AUDIT_TAG, AsyncSink, NOTIFY_TAG};
use user_api_server::AppState;
use user_registry::Registry;

use crate::config::{ServeArgs, ServerConfig};
use crate::error::ServerError;

/// Сколько ждать HTTP сервер после сигнала, прежде чем прервать.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Период обслуживания histogram'ов Prometheus recorder'а.
const METRICS_UPKEEP: Duration = Duration::from_secs(5);

/// Глобальный Prometheus recorder. Ставится до создания sink'ов,
/// чтобы их handle'ы метрик попали в него.
fn install_metrics(token: CancellationToken) -> Result<PrometheusHandle, ServerError> {
    let handle = user_api_server::prometheus_builder()
        .and_then(|builder| builder.install_recorder())
        .map_err(|e| ServerError::Metrics(e.to_string()))?;

    let upkeep = handle.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(METRICS_UPKEEP);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tick.tick() => upkeep.run_upkeep(),
            }
        }
    });

    tracing::info!("prometheus recorder installed");
    Ok(handle)
}

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("user-service starting");

    // --- Load config ---
    let config = ServerConfig::resolve(&args)?;
    tracing::info!(
        config = args.config.as_deref().unwrap_or("<defaults>"),
        api_port = config.api_port,
        "loaded config"
    );

    let token = CancellationToken::new();
    let metrics = install_metrics(token.clone())?;

    // --- Core: registry + sinks, один экземпляр на процесс ---
    let registry = Arc::new(Registry::new());
    let audit = Arc::new(AsyncSink::from_config(AUDIT_TAG, &config.audit));
    let notify = Arc::new(AsyncSink::from_config(NOTIFY_TAG, &config.notify));

    let state = AppState {
        registry: registry.clone(),
        audit: audit.clone(),
        notify: notify.clone(),
        metrics,
    };

    // --- API server ---
    let api_port = config.api_port;
    let api_token = token.clone();
    let mut api_handle =
        tokio::spawn(async move { user_api_server::run(api_port, state, api_token).await });

    tracing::info!("server ready");

    // --- Ожидание Ctrl+C или падения сервера ---
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("shutting down...");
        }
        result = &mut api_handle => {
            return match result {
                Ok(served) => served.map_err(ServerError::from),
                Err(e) => {
                    tracing::error!(error = %e, "api server task failed");
                    Ok(())
                }
            };
        }
    }

    token.cancel();

    match tokio::time::timeout(SHUTDOWN_GRACE, &mut api_handle).await {
        Ok(Ok(served)) => served?,
        Ok(Err(e)) => tracing::error!(error = %e, "api server task failed"),
        Err(_) => {
            tracing::warn!("api server did not stop in time, aborting");
            api_handle.abort();
        }
    }

    // Sink'и не дренируются: недоставленные строки теряются вместе с процессом.
    tracing::info!(
        users = registry.len(),
        audit = ?audit.stats(),
        notify = ?notify.stats(),
        "shutdown complete"
    );
    Ok(())
}
