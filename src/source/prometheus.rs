use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{FetchError, MetricSource};

/// Client for the Prometheus instant-query API
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    http_client: reqwest::Client,
    base_url: String,
}

/// `{ data: { result: [ { value: [ts, "v"] } ] } }`
#[derive(Debug, Deserialize)]
struct QueryResponse {
    data: QueryData,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    result: Vec<QuerySample>,
}

#[derive(Debug, Deserialize)]
struct QuerySample {
    value: Vec<serde_json::Value>,
}

impl PrometheusClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Pull `data.result[0].value[1]` out of a query response body
    fn extract_value(body: &[u8]) -> Result<String, FetchError> {
        let response: QueryResponse =
            serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;

        let sample = response
            .data
            .result
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Shape("empty result set".to_string()))?;

        match sample.value.into_iter().nth(1) {
            Some(serde_json::Value::String(value)) => Ok(value),
            Some(other) => Err(FetchError::Shape(format!(
                "sample value is not a string: {}",
                other
            ))),
            None => Err(FetchError::Shape("sample has no value".to_string())),
        }
    }
}

#[async_trait]
impl MetricSource for PrometheusClient {
    async fn fetch(&self, query: &str) -> Result<String, FetchError> {
        let url = format!("{}/api/v1/query", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[("query", query)])
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Self::extract_value(&body)
    }
}
