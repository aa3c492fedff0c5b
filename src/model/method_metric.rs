//! Per-method metric collections.

use serde::{Deserialize, Serialize};

use super::metric::Metric;

/// The metrics of one method, identified by its full signature name within
/// its class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodMetric {
    /// Full method name, the merge identity within a class.
    full_name: String,
    /// Display name (no arguments, no owner path).
    short_name: String,
    /// Declaration line when the producing format knows it.
    pub line: Option<u32>,
    metrics: Vec<Metric>,
}

impl MethodMetric {
    pub fn new(full_name: &str, short_name: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            short_name: short_name.to_string(),
            line: None,
            metrics: Vec::new(),
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// Metrics in insertion order. Order is observable: appended metrics from
    /// later merges come after the original entries.
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn add_metric(&mut self, metric: Metric) {
        self.metrics.push(metric);
    }

    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Merges `other` into `self`.
    ///
    /// Duplicate metric names take the incoming value (last merge wins);
    /// metrics only present in `other` are appended, preserving the order of
    /// the existing entries.
    pub fn merge(&mut self, other: MethodMetric) {
        if self.line.is_none() {
            self.line = other.line;
        }

        for incoming in other.metrics {
            match self.metrics.iter_mut().find(|m| m.name == incoming.name) {
                Some(existing) => {
                    existing.value = incoming.value;
                }
                None => self.metrics.push(incoming),
            }
        }
    }
}
