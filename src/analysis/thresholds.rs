//! Threshold-exceedance analysis.
//!
//! Independent of the top-N ranking: every method is checked against a
//! per-metric-name threshold map, and a method is flagged as soon as any of
//! its code-quality metrics strictly exceeds its threshold.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Assembly, Metric, MetricKind};

/// One code-quality metric of a flagged method, with its verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricStatus {
    pub metric: Metric,
    pub exceeded: bool,
    /// How far above the threshold the value is; `None` when not exceeded
    /// or no threshold is configured for the metric.
    pub delta: Option<f64>,
}

/// A method with at least one exceeded code-quality metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedMethod {
    pub assembly_short_name: String,
    pub class_name: String,
    pub method_short_name: String,
    pub status_metrics: Vec<MetricStatus>,
}

/// Result of one threshold analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdAnalysis {
    /// Flagged methods; no ordering is defined.
    pub flagged: Vec<FlaggedMethod>,
    /// Whether any code-quality metric existed at all. When false, showing
    /// an empty hotspot view would be misleading — there was nothing to
    /// check.
    pub code_quality_metrics_available: bool,
}

/// Evaluates every method's code-quality metrics against the thresholds,
/// keyed by metric name. Values strictly greater than the threshold exceed
/// it.
pub fn analyze_thresholds(
    assemblies: &[Assembly],
    thresholds: &HashMap<String, f64>,
) -> ThresholdAnalysis {
    let mut analysis = ThresholdAnalysis::default();

    for assembly in assemblies {
        for class in assembly.classes() {
            for method in class.method_metrics() {
                let quality_metrics: Vec<&Metric> = method
                    .metrics()
                    .iter()
                    .filter(|m| m.kind == MetricKind::CodeQuality)
                    .collect();

                analysis.code_quality_metrics_available |= !quality_metrics.is_empty();

                let status_metrics: Vec<MetricStatus> = quality_metrics
                    .into_iter()
                    .map(|metric| status_of(metric, thresholds))
                    .collect();

                if status_metrics.iter().any(|s| s.exceeded) {
                    analysis.flagged.push(FlaggedMethod {
                        assembly_short_name: assembly.short_name().to_string(),
                        class_name: class.name().to_string(),
                        method_short_name: method.short_name().to_string(),
                        status_metrics,
                    });
                }
            }
        }
    }

    analysis
}

fn status_of(metric: &Metric, thresholds: &HashMap<String, f64>) -> MetricStatus {
    let threshold = thresholds.get(&metric.name);
    let exceeded = match (metric.value, threshold) {
        (Some(value), Some(&threshold)) => value > threshold,
        _ => false,
    };

    MetricStatus {
        metric: metric.clone(),
        exceeded,
        delta: exceeded.then(|| metric.value.unwrap_or(0.0) - threshold.copied().unwrap_or(0.0)),
    }
}
