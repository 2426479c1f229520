//! One evaluation cycle: fetch, resolve, compose, dispatch

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use super::composer::compose;
use super::resolver::{resolve, Metric};
use crate::config::Config;
use crate::notify::Notifier;
use crate::source::MetricSource;

/// Evaluation engine shared by the timer and the on-demand trigger
pub struct Engine {
    config: Arc<Config>,
    source: Arc<dyn MetricSource>,
    notifier: Arc<dyn Notifier>,
    /// Set while a cycle runs; overlapping triggers are skipped
    running: AtomicBool,
}

/// What a cycle did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Another cycle was already in progress
    Skipped,
    /// No metrics are configured
    NoMetrics,
    /// No level is configured
    NoActiveLevel,
    /// Messages were composed for the active level's destinations
    Dispatched {
        level: usize,
        color: String,
        delivered: usize,
        failed: usize,
    },
}

/// Cycle summary returned to triggers
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    /// Metrics whose value could not be fetched
    pub unavailable_metrics: Vec<String>,
    #[serde(flatten)]
    pub outcome: CycleOutcome,
}

/// Clears the running flag when the cycle ends, however it ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Engine {
    pub fn new(
        config: Arc<Config>,
        source: Arc<dyn MetricSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            source,
            notifier,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one cycle; failures are logged, never returned
    pub async fn run_cycle(&self) -> CycleReport {
        let started_at = chrono::Utc::now();

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::info!("Cycle already in progress, skipping");
            return CycleReport {
                started_at,
                finished_at: chrono::Utc::now(),
                unavailable_metrics: Vec::new(),
                outcome: CycleOutcome::Skipped,
            };
        }
        let _guard = RunningGuard(&self.running);

        let metrics = self.fetch_metrics().await;
        let unavailable_metrics = metrics
            .values()
            .filter(|m| m.is_unavailable())
            .map(|m| m.name.clone())
            .collect();

        let outcome = self.evaluate(&metrics).await;

        CycleReport {
            started_at,
            finished_at: chrono::Utc::now(),
            unavailable_metrics,
            outcome,
        }
    }

    async fn evaluate(&self, metrics: &BTreeMap<String, Metric>) -> CycleOutcome {
        if metrics.is_empty() {
            tracing::debug!("No metrics configured");
            return CycleOutcome::NoMetrics;
        }

        let resolution = resolve(metrics, &self.config.notification_levels);
        let (index, evaluation) = match resolution
            .active_level
            .and_then(|i| resolution.levels.get(i).map(|l| (i, l)))
        {
            Some(active) => active,
            None => {
                tracing::debug!("No notification level configured");
                return CycleOutcome::NoActiveLevel;
            }
        };

        let level = &self.config.notification_levels[index];
        tracing::info!(level = index, color = %level.color, "Active level resolved");

        let sends = level.slack_webhooks.iter().filter_map(|name| {
            let destination = match self.config.slack_webhooks.get(name) {
                Some(d) => d,
                None => {
                    tracing::error!(destination = %name, "Unknown destination");
                    return None;
                }
            };
            let message = compose(&level.slack_message, destination, &level.color, &evaluation.metrics);
            Some(async move {
                let result = self.notifier.send(name, destination, &message).await;
                if let Err(ref e) = result {
                    tracing::error!(destination = %name, error = %e, "Failed to send notification");
                }
                result.is_ok()
            })
        });

        let results = futures::future::join_all(sends).await;
        let delivered = results.iter().filter(|ok| **ok).count();
        let failed = level.slack_webhooks.len() - delivered;

        CycleOutcome::Dispatched {
            level: index,
            color: level.color.clone(),
            delivered,
            failed,
        }
    }

    /// Fetch every configured metric concurrently; failures leave the value empty
    async fn fetch_metrics(&self) -> BTreeMap<String, Metric> {
        let fetches = self.config.metrics.iter().map(|(name, def)| async move {
            let value = match self.source.fetch(&def.query).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(metric = %name, query = %def.query, error = %e, "Failed to fetch metric");
                    String::new()
                }
            };
            (name.clone(), Metric::fetched(name.as_str(), def, value))
        });

        futures::future::join_all(fetches).await.into_iter().collect()
    }
}
