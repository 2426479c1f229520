use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::handlers::{health_check, scrap, AppState};
use crate::config::Config;
use crate::engine::{CycleWorker, Engine};
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::source::PrometheusClient;

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // On-demand evaluation
        .route("/scrap", post(scrap))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire up the engine, start the timer and serve the trigger endpoint
pub async fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(config);

    let source = Arc::new(PrometheusClient::with_timeout(
        config.prometheus_url.clone(),
        config.request_timeout(),
    )?);

    let notifier: Arc<dyn Notifier> = if config.dry_run {
        tracing::info!("Dry run: notifications are logged, not sent");
        Arc::new(LogNotifier)
    } else {
        Arc::new(WebhookNotifier::new(config.request_timeout())?)
    };

    let engine = Arc::new(Engine::new(Arc::clone(&config), source, notifier));

    // Start timer-driven cycles
    let mut worker = CycleWorker::new(Arc::clone(&engine), config.scrape_interval());
    let worker_handle = worker.start();

    let state = Arc::new(AppState { engine });
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting daemon listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    worker.stop().await;
    if let Err(e) = worker_handle.await {
        tracing::warn!(error = %e, "Cycle worker ended abnormally");
    }

    tracing::info!("Escalator stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received, stopping cycle worker...");
}
