//! Canonical coverage model and merge algebra.
//!
//! Parsers of every report schema populate this one entity graph:
//! [`Assembly`] → [`Class`] → [`CodeFile`] / [`MethodMetric`] → [`Metric`].
//! Fragments describing the same binary are folded together with the merge
//! rules documented on each type: set-valued collections union by natural
//! identity, scalar values (metric values, declared coverage quotas) take the
//! most recently merged value.

pub mod assembly;
pub mod class;
pub mod code_file;
pub mod method_metric;
pub mod metric;
pub mod result;

pub use assembly::Assembly;
pub use class::{normalize_class_name, Class};
pub use code_file::{Branch, CodeFile, LineVisitStatus};
pub use method_metric::MethodMetric;
pub use metric::{crap_score, Metric, MetricKind};
pub use result::CoverageModel;
