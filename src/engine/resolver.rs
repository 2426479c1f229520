//! Level resolution
//!
//! Walks the escalation levels in configured order and picks the active one.
//! Level 0 is the baseline: it is active whenever any level is configured and
//! no later level breaches. A later level takes over as soon as one of its
//! leverage metrics reaches its threshold, so the highest breached level wins.
//!
//! Alongside the decision, every level gets its own annotated copy of the
//! fetched metrics. The fetched metrics themselves are never mutated.

use std::collections::BTreeMap;

use serde::Serialize;

use super::comparator::{compare, Comparison};
use crate::config::{MetricDef, NotificationLevel};

/// A metric with its fetched value and per-level annotations
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub display_name: String,
    pub query: String,
    /// Threshold for the level this record belongs to
    pub threshold: String,
    /// Fetched value; empty when the fetch failed
    pub last_value: String,
    /// This metric can trigger the level
    pub leverage: bool,
    /// This metric reached the level's threshold
    pub threshold_exceeded: bool,
}

impl Metric {
    /// Metric as fetched, before any level annotation
    pub fn fetched(name: impl Into<String>, def: &MetricDef, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: def.display_name.clone(),
            query: def.query.clone(),
            threshold: def.threshold.clone(),
            last_value: value.into(),
            leverage: false,
            threshold_exceeded: false,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.last_value.is_empty()
    }
}

/// One level's view of the cycle
#[derive(Debug, Clone)]
pub struct LevelEvaluation {
    pub color: String,
    /// Comparison outcome per leverage metric
    pub comparisons: BTreeMap<String, Comparison>,
    /// All fetched metrics, annotated for this level
    pub metrics: BTreeMap<String, Metric>,
}

impl LevelEvaluation {
    pub fn breached(&self) -> bool {
        self.comparisons.values().any(Comparison::is_exceeded)
    }
}

/// Result of resolving one cycle
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Index of the active level, `None` when nothing can be notified
    pub active_level: Option<usize>,
    /// Evaluations indexed like the configured levels
    pub levels: Vec<LevelEvaluation>,
}

impl Resolution {
    /// Annotated metrics for a level
    pub fn metrics_for(&self, level: usize) -> Option<&BTreeMap<String, Metric>> {
        self.levels.get(level).map(|l| &l.metrics)
    }
}

/// Pick the active level and annotate metrics for every level
pub fn resolve(metrics: &BTreeMap<String, Metric>, levels: &[NotificationLevel]) -> Resolution {
    if metrics.is_empty() {
        return Resolution::default();
    }

    let mut active_level = None;
    let mut evaluations = Vec::with_capacity(levels.len());

    for (i, level) in levels.iter().enumerate() {
        if i == 0 {
            active_level = Some(0);
        }

        let comparisons = evaluate_level(i, level, metrics);
        let evaluation = LevelEvaluation {
            color: level.color.clone(),
            metrics: annotate(metrics, level, &comparisons),
            comparisons,
        };

        if evaluation.breached() {
            tracing::debug!(level = i, color = %level.color, "Level breached");
            active_level = Some(i);
        }

        evaluations.push(evaluation);
    }

    Resolution {
        active_level,
        levels: evaluations,
    }
}

fn evaluate_level(
    index: usize,
    level: &NotificationLevel,
    metrics: &BTreeMap<String, Metric>,
) -> BTreeMap<String, Comparison> {
    level
        .leverage_metrics
        .iter()
        .map(|(name, threshold)| {
            let value = metrics.get(name).map(|m| m.last_value.as_str()).unwrap_or("");
            let outcome = compare(value, threshold);
            if let Comparison::Undetermined(ref e) = outcome {
                tracing::warn!(
                    level = index,
                    color = %level.color,
                    metric = %name,
                    error = %e,
                    "Could not compare metric against threshold"
                );
            }
            (name.clone(), outcome)
        })
        .collect()
}

fn annotate(
    metrics: &BTreeMap<String, Metric>,
    level: &NotificationLevel,
    comparisons: &BTreeMap<String, Comparison>,
) -> BTreeMap<String, Metric> {
    metrics
        .iter()
        .map(|(name, metric)| {
            let mut annotated = metric.clone();
            if let Some(threshold) = level.leverage_metrics.get(name) {
                annotated.leverage = true;
                if !threshold.is_empty() {
                    annotated.threshold = threshold.clone();
                }
                annotated.threshold_exceeded = comparisons
                    .get(name)
                    .map(Comparison::is_exceeded)
                    .unwrap_or(false);
            }
            (name.clone(), annotated)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetched(values: &[(&str, &str)]) -> BTreeMap<String, Metric> {
        values
            .iter()
            .map(|(name, value)| {
                let def = MetricDef::new(name.to_uppercase(), format!("{}_query", name));
                (name.to_string(), Metric::fetched(*name, &def, *value))
            })
            .collect()
    }

    fn levels() -> Vec<NotificationLevel> {
        vec![
            NotificationLevel::new("green"),
            NotificationLevel::new("yellow").with_leverage("cpu", "70"),
            NotificationLevel::new("red")
                .with_leverage("cpu", "90")
                .with_leverage("mem", "95"),
        ]
    }

    #[test]
    fn test_single_level_breach() {
        let metrics = fetched(&[("cpu", "85")]);
        let levels = vec![NotificationLevel::new("red").with_leverage("cpu", "80")];

        let resolution = resolve(&metrics, &levels);
        assert_eq!(resolution.active_level, Some(0));
        assert!(resolution.levels[0].breached());
        assert!(resolution.metrics_for(0).unwrap()["cpu"].threshold_exceeded);
    }

    #[test]
    fn test_baseline_when_nothing_breaches() {
        let metrics = fetched(&[("cpu", "10"), ("mem", "20")]);

        let resolution = resolve(&metrics, &levels());
        assert_eq!(resolution.active_level, Some(0));
        assert_eq!(resolution.levels.len(), 3);
        assert!(resolution.levels.iter().all(|l| !l.breached()));
    }

    #[test]
    fn test_highest_breached_level_wins() {
        let metrics = fetched(&[("cpu", "92"), ("mem", "20")]);
        let resolution = resolve(&metrics, &levels());
        assert_eq!(resolution.active_level, Some(2));

        let metrics = fetched(&[("cpu", "75"), ("mem", "20")]);
        let resolution = resolve(&metrics, &levels());
        assert_eq!(resolution.active_level, Some(1));
    }

    #[test]
    fn test_later_level_wins_even_if_middle_does_not_breach() {
        // mem only levers red; yellow stays quiet
        let metrics = fetched(&[("cpu", "10"), ("mem", "99")]);
        let resolution = resolve(&metrics, &levels());
        assert_eq!(resolution.active_level, Some(2));
        assert!(!resolution.levels[1].breached());
    }

    #[test]
    fn test_annotations_are_per_level() {
        let metrics = fetched(&[("cpu", "75"), ("mem", "20")]);
        let resolution = resolve(&metrics, &levels());

        let green = resolution.metrics_for(0).unwrap();
        assert_eq!(green.len(), 2);
        assert!(!green["cpu"].leverage);
        assert!(green["cpu"].threshold.is_empty());

        let yellow = resolution.metrics_for(1).unwrap();
        assert!(yellow["cpu"].leverage);
        assert_eq!(yellow["cpu"].threshold, "70");
        assert!(yellow["cpu"].threshold_exceeded);
        assert!(!yellow["mem"].leverage);
        assert!(!yellow["mem"].threshold_exceeded);

        let red = resolution.metrics_for(2).unwrap();
        assert_eq!(red["cpu"].threshold, "90");
        assert!(!red["cpu"].threshold_exceeded);
        assert!(red["mem"].leverage);
        assert!(!red["mem"].threshold_exceeded);

        // inputs are untouched
        assert!(!metrics["cpu"].leverage);
        assert_eq!(metrics["cpu"].last_value, "75");
    }

    #[test]
    fn test_unavailable_metric_does_not_escalate() {
        let metrics = fetched(&[("cpu", ""), ("mem", "99")]);
        let levels = vec![
            NotificationLevel::new("green"),
            NotificationLevel::new("yellow").with_leverage("cpu", "0"),
        ];

        let resolution = resolve(&metrics, &levels);
        assert_eq!(resolution.active_level, Some(0));
        assert!(matches!(
            resolution.levels[1].comparisons["cpu"],
            Comparison::Undetermined(_)
        ));
        assert!(metrics["cpu"].is_unavailable());
    }

    #[test]
    fn test_undefined_leverage_metric() {
        let metrics = fetched(&[("cpu", "50")]);
        let levels = vec![
            NotificationLevel::new("green"),
            NotificationLevel::new("red").with_leverage("disk", "1"),
        ];

        let resolution = resolve(&metrics, &levels);
        assert_eq!(resolution.active_level, Some(0));
        assert!(!resolution.metrics_for(1).unwrap().contains_key("disk"));
    }

    #[test]
    fn test_no_metrics_means_no_level() {
        let resolution = resolve(&BTreeMap::new(), &levels());
        assert_eq!(resolution.active_level, None);
        assert!(resolution.levels.is_empty());
    }

    #[test]
    fn test_no_levels_means_no_level() {
        let resolution = resolve(&fetched(&[("cpu", "50")]), &[]);
        assert_eq!(resolution.active_level, None);
    }

    #[test]
    fn test_baseline_leverage_is_irrelevant() {
        let metrics = fetched(&[("cpu", "1")]);
        let levels = vec![NotificationLevel::new("green").with_leverage("cpu", "50")];

        let resolution = resolve(&metrics, &levels);
        assert_eq!(resolution.active_level, Some(0));
        assert!(!resolution.levels[0].breached());
    }

    #[test]
    fn test_empty_leverage_threshold_keeps_display_threshold() {
        let def = MetricDef {
            threshold: "80".to_string(),
            ..MetricDef::new("CPU", "cpu_query")
        };
        let metrics: BTreeMap<String, Metric> =
            [("cpu".to_string(), Metric::fetched("cpu", &def, "99"))].into();
        let levels = vec![
            NotificationLevel::new("green"),
            NotificationLevel::new("red").with_leverage("cpu", ""),
        ];

        let resolution = resolve(&metrics, &levels);
        assert_eq!(resolution.active_level, Some(0));

        let cpu = &resolution.metrics_for(1).unwrap()["cpu"];
        assert!(cpu.leverage);
        assert_eq!(cpu.threshold, "80");
        assert!(!cpu.threshold_exceeded);
    }
}
