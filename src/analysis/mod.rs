//! Risk analysis over the merged, filtered coverage model.
//!
//! Two independent views: [`hotspots::detect_hotspots`] ranks classes by
//! their single worst method, [`thresholds::analyze_thresholds`] flags every
//! method whose code-quality metrics exceed configured limits. They stay
//! separate operations — collaborators need either one without the other.

pub mod hotspots;
pub mod thresholds;

pub use hotspots::{detect_hotspots, RiskHotspot, DEFAULT_MAX_HOTSPOTS};
pub use thresholds::{analyze_thresholds, FlaggedMethod, MetricStatus, ThresholdAnalysis};
