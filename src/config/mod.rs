//! Service configuration
//!
//! Loaded once at startup from a JSON document and never mutated afterwards.
//! Components receive it as `Arc<Config>`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::message::NotificationMessage;

/// Top-level configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Free-form config version
    #[serde(default)]
    pub version: String,
    /// Bind address for the HTTP trigger endpoint
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port (accepts `"8080"` or `8080`)
    #[serde(default = "default_port", deserialize_with = "port_serde::deserialize")]
    pub port: u16,
    /// Base URL of the Prometheus-compatible query backend
    pub prometheus_url: String,
    /// Minutes between timer-driven cycles; non-positive means one minute
    #[serde(default)]
    pub scrapper_minutes: i64,
    /// Per-call timeout for metric fetches and webhook deliveries
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Log composed messages instead of POSTing them
    #[serde(default)]
    pub dry_run: bool,
    /// Metric definitions by name
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricDef>,
    /// Escalation levels, lowest severity first
    #[serde(default)]
    pub notification_levels: Vec<NotificationLevel>,
    /// Destinations by name
    #[serde(default)]
    pub slack_webhooks: BTreeMap<String, SlackWebhook>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// A metric to fetch every cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricDef {
    #[serde(default)]
    pub display_name: String,
    pub query: String,
    /// Display-only default threshold; levels override it
    #[serde(default)]
    pub threshold: String,
}

impl MetricDef {
    pub fn new(display_name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            query: query.into(),
            threshold: String::new(),
        }
    }
}

/// One escalation level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationLevel {
    /// Level identifier, also the key into destination visibility maps
    pub color: String,
    /// Destinations notified while this level is active
    #[serde(default)]
    pub slack_webhooks: Vec<String>,
    /// Message template
    #[serde(default)]
    pub slack_message: NotificationMessage,
    /// Metric name -> threshold; any breach makes this level a candidate
    #[serde(default)]
    pub leverage_metrics: BTreeMap<String, String>,
}

impl NotificationLevel {
    pub fn new(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            ..Default::default()
        }
    }

    pub fn with_leverage(mut self, metric: impl Into<String>, threshold: impl Into<String>) -> Self {
        self.leverage_metrics.insert(metric.into(), threshold.into());
        self
    }

    pub fn with_webhook(mut self, name: impl Into<String>) -> Self {
        self.slack_webhooks.push(name.into());
        self
    }

    pub fn with_message(mut self, message: NotificationMessage) -> Self {
        self.slack_message = message;
        self
    }
}

/// A webhook destination
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackWebhook {
    pub url: String,
    /// Color -> include detail blocks
    #[serde(default)]
    pub show_details: HashMap<String, bool>,
    /// Color -> include action blocks
    #[serde(default)]
    pub show_actions: HashMap<String, bool>,
}

impl SlackWebhook {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_details(mut self, color: impl Into<String>, show: bool) -> Self {
        self.show_details.insert(color.into(), show);
        self
    }

    pub fn with_actions(mut self, color: impl Into<String>, show: bool) -> Self {
        self.show_actions.insert(color.into(), show);
        self
    }

    pub fn shows_details(&self, color: &str) -> bool {
        self.show_details.get(color).copied().unwrap_or(false)
    }

    pub fn shows_actions(&self, color: &str) -> bool {
        self.show_actions.get(color).copied().unwrap_or(false)
    }
}

impl Config {
    /// Minimal config pointing at a backend, with nothing to evaluate
    pub fn new(prometheus_url: impl Into<String>) -> Self {
        Self {
            version: String::new(),
            host: default_host(),
            port: default_port(),
            prometheus_url: prometheus_url.into(),
            scrapper_minutes: 1,
            request_timeout_secs: default_request_timeout_secs(),
            dry_run: false,
            metrics: BTreeMap::new(),
            notification_levels: Vec::new(),
            slack_webhooks: BTreeMap::new(),
        }
    }

    /// Read, parse and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&raw)
    }

    /// Parse and validate a JSON config document
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply ESCALATOR_* environment overrides
    ///
    /// ESCALATOR_HOST=0.0.0.0
    /// ESCALATOR_PORT=8080
    /// ESCALATOR_PROMETHEUS_URL=http://prometheus:9090
    /// ESCALATOR_SCRAPPER_MINUTES=5
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("ESCALATOR_HOST") {
            self.host = host;
        }
        if let Some(port) = std::env::var("ESCALATOR_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            self.port = port;
        }
        if let Some(url) = std::env::var("ESCALATOR_PROMETHEUS_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
        {
            self.prometheus_url = url;
        }
        if let Some(minutes) = std::env::var("ESCALATOR_SCRAPPER_MINUTES")
            .ok()
            .and_then(|m| m.parse().ok())
        {
            self.scrapper_minutes = minutes;
        }
        self
    }

    /// Check cross references between levels, metrics and webhooks
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prometheus_url.trim().is_empty() {
            return Err(ConfigError::Invalid("prometheus_url is empty".to_string()));
        }

        for (i, level) in self.notification_levels.iter().enumerate() {
            for webhook in &level.slack_webhooks {
                if !self.slack_webhooks.contains_key(webhook) {
                    return Err(ConfigError::Invalid(format!(
                        "level {} ({}) references unknown webhook '{}'",
                        i, level.color, webhook
                    )));
                }
            }

            for metric in level.leverage_metrics.keys() {
                if !self.metrics.contains_key(metric) {
                    tracing::warn!(
                        level = i,
                        color = %level.color,
                        metric = %metric,
                        "Leverage metric is not defined and will never escalate"
                    );
                }
            }
        }

        if let Some(baseline) = self.notification_levels.first() {
            if !baseline.leverage_metrics.is_empty() {
                tracing::warn!(
                    color = %baseline.color,
                    "Level 0 is the default level; its leverage metrics do not change the outcome"
                );
            }
        }

        Ok(())
    }

    /// Delay between timer-driven cycles
    pub fn scrape_interval(&self) -> Duration {
        let minutes = self.scrapper_minutes.max(1) as u64;
        Duration::from_secs(minutes.saturating_mul(60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Configuration errors (fatal at startup)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Port deserialization helper
mod port_serde {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortRepr {
        Number(u16),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u16, D::Error>
    where
        D: Deserializer<'de>,
    {
        match PortRepr::deserialize(deserializer)? {
            PortRepr::Number(port) => Ok(port),
            PortRepr::Text(text) => text
                .trim()
                .trim_start_matches(':')
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid port '{}'", text))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r##"{
        "version": "1",
        "port": "9095",
        "prometheus_url": "http://prometheus:9090",
        "scrapper_minutes": 5,
        "metrics": {
            "cpu": {"display_name": "CPU", "query": "avg(rate(cpu[5m]))"},
            "mem": {"display_name": "Memory", "query": "avg(mem_used)"}
        },
        "notification_levels": [
            {"color": "green", "slack_webhooks": [], "slack_message": {"blocks": []}},
            {
                "color": "red",
                "slack_webhooks": ["ops"],
                "leverage_metrics": {"cpu": "80"},
                "slack_message": {
                    "blocks": [{"type": "header", "text": {"type": "plain_text", "text": "Alert"}}],
                    "detail_blocks": [{"type": "section", "text": {"type": "mrkdwn", "text": "{{range .Metrics}}{{.DisplayName}}{{end}}"}}]
                }
            }
        ],
        "slack_webhooks": {
            "ops": {"url": "http://hooks.local/ops", "show_details": {"red": true}, "show_actions": {"red": false}}
        }
    }"##;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_json(SAMPLE).unwrap();

        assert_eq!(config.port, 9095);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.metrics.len(), 2);
        assert_eq!(config.notification_levels.len(), 2);
        assert_eq!(config.notification_levels[1].leverage_metrics["cpu"], "80");
        assert_eq!(config.request_timeout_secs, 10);
        assert!(!config.dry_run);

        let ops = &config.slack_webhooks["ops"];
        assert!(ops.shows_details("red"));
        assert!(!ops.shows_actions("red"));
        assert!(!ops.shows_details("green"));
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_json(include_str!("../../escalator.example.json")).unwrap();
        assert_eq!(config.notification_levels.len(), 3);
        assert!(config.notification_levels[0].leverage_metrics.is_empty());
        assert_eq!(config.slack_webhooks.len(), 2);
        assert_eq!(config.scrape_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_numeric_port() {
        let config = Config::from_json(r#"{"port": 7000, "prometheus_url": "http://p"}"#).unwrap();
        assert_eq!(config.port, 7000);

        let err = Config::from_json(r#"{"port": "abc", "prometheus_url": "http://p"}"#);
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_webhook_is_invalid() {
        let raw = r#"{
            "prometheus_url": "http://p",
            "notification_levels": [{"color": "red", "slack_webhooks": ["missing"]}]
        }"#;
        let err = Config::from_json(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_empty_backend_is_invalid() {
        let err = Config::from_json(r#"{"prometheus_url": " "}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_scrape_interval_floor() {
        let mut config = Config::new("http://p");
        config.scrapper_minutes = 0;
        assert_eq!(config.scrape_interval(), Duration::from_secs(60));

        config.scrapper_minutes = -3;
        assert_eq!(config.scrape_interval(), Duration::from_secs(60));

        config.scrapper_minutes = 5;
        assert_eq!(config.scrape_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_scrape_interval_saturates() {
        let mut config = Config::new("http://p");
        config.scrapper_minutes = i64::MAX;
        assert_eq!(config.scrape_interval(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_env_overrides() {
        // Only this test touches ESCALATOR_* variables
        let base = || Config::from_json(SAMPLE).unwrap();
        let original = base();

        std::env::set_var("ESCALATOR_HOST", "127.0.0.1");
        std::env::set_var("ESCALATOR_PORT", "9191");
        std::env::set_var("ESCALATOR_PROMETHEUS_URL", "http://prom.internal:9090");
        std::env::set_var("ESCALATOR_SCRAPPER_MINUTES", "15");

        let config = base().with_env_overrides();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9191);
        assert_eq!(config.prometheus_url, "http://prom.internal:9090");
        assert_eq!(config.scrapper_minutes, 15);

        // Unparseable or empty values leave the document's values alone
        std::env::set_var("ESCALATOR_PORT", "not-a-port");
        std::env::set_var("ESCALATOR_PROMETHEUS_URL", "  ");
        std::env::set_var("ESCALATOR_SCRAPPER_MINUTES", "soon");

        let config = base().with_env_overrides();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, original.port);
        assert_eq!(config.prometheus_url, original.prometheus_url);
        assert_eq!(config.scrapper_minutes, original.scrapper_minutes);

        std::env::set_var("ESCALATOR_PORT", "70000");
        assert_eq!(base().with_env_overrides().port, original.port);

        for var in [
            "ESCALATOR_HOST",
            "ESCALATOR_PORT",
            "ESCALATOR_PROMETHEUS_URL",
            "ESCALATOR_SCRAPPER_MINUTES",
        ] {
            std::env::remove_var(var);
        }

        let config = base().with_env_overrides();
        assert_eq!(config.host, original.host);
        assert_eq!(config.port, original.port);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.prometheus_url, "http://prometheus:9090");

        let err = Config::from_file("/nonexistent/escalator.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
