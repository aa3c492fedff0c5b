//! Named metrics attached to methods.

use serde::{Deserialize, Serialize};

/// Canonical metric names shared by parsers and the risk analyzers.
///
/// Parsers that emit one of these concepts must use the canonical spelling,
/// otherwise merge-by-name and threshold lookup silently miss.
pub mod names {
    pub const CYCLOMATIC_COMPLEXITY: &str = "Cyclomatic complexity";
    pub const NPATH_COMPLEXITY: &str = "NPath complexity";
    pub const CRAP_SCORE: &str = "Crap score";
    pub const SEQUENCE_COVERAGE: &str = "Sequence coverage";
    pub const LINE_COVERAGE: &str = "Line coverage";
    pub const BRANCH_COVERAGE: &str = "Branch coverage";
}

/// Semantic kind of a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricKind {
    /// Percentual value (e.g. line coverage).
    Percentage,
    /// Code quality indicator (e.g. cyclomatic complexity).
    CodeQuality,
    /// A sumable absolute value (e.g. number of visited blocks).
    Sumable,
}

/// A named metric value, optionally with an explanation link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub kind: MetricKind,
    /// `None` when the producing tool declared the metric but no value.
    pub value: Option<f64>,
    pub explanation_url: Option<String>,
}

impl Metric {
    pub fn new(name: &str, kind: MetricKind, value: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            value,
            explanation_url: None,
        }
    }

    pub fn with_explanation_url(mut self, url: &str) -> Self {
        self.explanation_url = Some(url.to_string());
        self
    }

    pub fn cyclomatic_complexity(value: Option<f64>) -> Self {
        Metric::new(names::CYCLOMATIC_COMPLEXITY, MetricKind::CodeQuality, value)
            .with_explanation_url("https://en.wikipedia.org/wiki/Cyclomatic_complexity")
    }

    pub fn npath_complexity(value: Option<f64>) -> Self {
        Metric::new(names::NPATH_COMPLEXITY, MetricKind::CodeQuality, value)
    }

    pub fn crap_score(value: Option<f64>) -> Self {
        Metric::new(names::CRAP_SCORE, MetricKind::CodeQuality, value)
            .with_explanation_url("https://testing.googleblog.com/2011/02/this-code-is-crap.html")
    }

    pub fn sequence_coverage(value: Option<f64>) -> Self {
        Metric::new(names::SEQUENCE_COVERAGE, MetricKind::Percentage, value)
    }

    pub fn line_coverage(value: Option<f64>) -> Self {
        Metric::new(names::LINE_COVERAGE, MetricKind::Percentage, value)
    }

    pub fn branch_coverage(value: Option<f64>) -> Self {
        Metric::new(names::BRANCH_COVERAGE, MetricKind::Percentage, value)
    }
}

/// CRAP score: `comp² × (1 − cov/100)³ + comp`.
///
/// `coverage` is a percentage in `0..=100`; fully covered code scores exactly
/// its complexity, fully uncovered code scores `comp² + comp`.
pub fn crap_score(complexity: f64, coverage: f64) -> f64 {
    let uncovered = 1.0 - (coverage / 100.0);
    complexity * complexity * uncovered.powi(3) + complexity
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crap_score_fully_covered_equals_complexity() {
        assert_eq!(crap_score(7.0, 100.0), 7.0);
    }

    #[test]
    fn test_crap_score_uncovered() {
        // comp=5, cov=0 -> 25 + 5
        assert_eq!(crap_score(5.0, 0.0), 30.0);
    }

    #[test]
    fn test_metric_constructors_use_canonical_names() {
        assert_eq!(
            Metric::cyclomatic_complexity(Some(3.0)).name,
            names::CYCLOMATIC_COMPLEXITY
        );
        assert_eq!(
            Metric::branch_coverage(None).kind,
            MetricKind::Percentage
        );
    }
}
