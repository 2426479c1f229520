//! Escalator daemon
//!
//! Run with: escalator <config.json path>
//!
//! Environment variables:
//! - ESCALATOR_HOST: Bind address (overrides config `host`)
//! - ESCALATOR_PORT: Port number (overrides config `port`)
//! - ESCALATOR_PROMETHEUS_URL: Query backend (overrides config `prometheus_url`)
//! - ESCALATOR_SCRAPPER_MINUTES: Minutes between cycles (overrides config `scrapper_minutes`)
//! - RUST_LOG: Log level (default: info)

use escalator::api::run_server;
use escalator::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "escalator=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("Syntax: escalator <config.json path>");
            std::process::exit(1);
        }
    };

    let config = match Config::from_file(&path) {
        Ok(config) => config.with_env_overrides(),
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Failed to load config");
            std::process::exit(1);
        }
    };

    tracing::info!("Escalator configuration:");
    tracing::info!("  Config version: {}", config.version);
    tracing::info!("  Listen: {}:{}", config.host, config.port);
    tracing::info!("  Backend: {}", config.prometheus_url);
    tracing::info!(
        "  Cycle interval: {} minutes",
        config.scrape_interval().as_secs() / 60
    );
    tracing::info!("  Metrics: {}", config.metrics.len());
    for (i, level) in config.notification_levels.iter().enumerate() {
        tracing::info!(
            "    level {} ({}): {} leverage metrics, {} webhooks",
            i,
            level.color,
            level.leverage_metrics.len(),
            level.slack_webhooks.len()
        );
    }
    tracing::info!("  Webhooks: {}", config.slack_webhooks.len());

    println!(
        r#"
  Escalator - metric escalation daemon
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );

    run_server(config).await
}
