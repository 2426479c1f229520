//! Escalator: metric threshold monitoring with ordered escalation levels
//!
//! Periodically queries a Prometheus-compatible backend for a set of named
//! metrics, decides which escalation level applies, and posts a Slack block
//! message to the webhooks configured for that level.
//!
//! # Features
//!
//! - **Ordered Levels**: index 0 is the baseline, the highest breached level wins
//! - **Inclusive Thresholds**: a metric breaches once it reaches its threshold
//! - **Per-Destination Visibility**: detail and action blocks toggled per color
//! - **Templated Details**: markdown sections rendered against the metrics
//! - **Two Triggers**: a fixed-interval timer and `POST /scrap`
//!
//! # Example
//!
//! ```no_run
//! use escalator::config::Config;
//! use escalator::engine::Engine;
//! use escalator::notify::LogNotifier;
//! use escalator::source::PrometheusClient;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(Config::from_file("escalator.json")?);
//! let source = Arc::new(PrometheusClient::new(config.prometheus_url.clone())?);
//! let engine = Engine::new(config, source, Arc::new(LogNotifier));
//!
//! let report = engine.run_cycle().await;
//! println!("Cycle: {:?}", report.outcome);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod message;
pub mod notify;
pub mod source;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use engine::{CycleOutcome, CycleReport, Engine};
pub use message::{Block, NotificationMessage};
