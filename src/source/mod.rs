//! Metric source: fetches the latest scalar for a query expression

pub mod prometheus;

pub use prometheus::PrometheusClient;

use async_trait::async_trait;

/// Anything that can turn a query expression into its current value
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Fetch the latest value for `query`, as the backend formats it
    async fn fetch(&self, query: &str) -> Result<String, FetchError>;
}

/// Metric fetch errors
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend returned status {0}")]
    Status(u16),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Unexpected response shape: {0}")]
    Shape(String),
}
