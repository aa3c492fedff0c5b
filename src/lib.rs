//! covmap: multi-format coverage report normalizer and risk hotspot
//! analyzer.
//!
//! Reports from independently evolved instrumentation tools (OpenCover,
//! Visual Studio, NCover, Cobertura, LCOV) are normalized into one coverage
//! model, enriched with source positions recovered from the real syntax
//! tree where a format omits them, merged deterministically, filtered, and
//! ranked for risk hotspots.

pub mod analysis;
pub mod cli;
pub mod common;
pub mod config;
pub mod errors;
pub mod filters;
pub mod formats;
pub mod model;
pub mod pipeline;
pub mod source;

// Re-export the surface collaborators work with.
pub use crate::analysis::{
    analyze_thresholds, detect_hotspots, RiskHotspot, ThresholdAnalysis, DEFAULT_MAX_HOTSPOTS,
};
pub use crate::config::{CovmapConfig, RiskThresholds};
pub use crate::errors::CovError;
pub use crate::filters::{Filter, ReportFilters};
pub use crate::model::{Assembly, Class, CodeFile, CoverageModel, MethodMetric, Metric};
pub use crate::pipeline::{collect_reports, PipelineOptions};
