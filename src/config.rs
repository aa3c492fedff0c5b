//! Configuration: risk thresholds and analysis limits.
//!
//! Loaded from an optional `covmap.toml` next to the working directory;
//! every field has a default so an absent file means default behavior.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::CovError;
use crate::model::metric::names;

/// Per-metric thresholds for the exceedance analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Threshold for cyclomatic complexity.
    #[serde(default = "default_cyclomatic_complexity")]
    pub cyclomatic_complexity: f64,

    /// Threshold for NPath complexity.
    #[serde(default = "default_npath_complexity")]
    pub npath_complexity: f64,

    /// Threshold for crap score.
    #[serde(default = "default_crap_score")]
    pub crap_score: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            cyclomatic_complexity: default_cyclomatic_complexity(),
            npath_complexity: default_npath_complexity(),
            crap_score: default_crap_score(),
        }
    }
}

impl RiskThresholds {
    /// The metric-name-keyed map the threshold analyzer consumes.
    pub fn by_metric_name(&self) -> HashMap<String, f64> {
        HashMap::from([
            (
                names::CYCLOMATIC_COMPLEXITY.to_string(),
                self.cyclomatic_complexity,
            ),
            (names::NPATH_COMPLEXITY.to_string(), self.npath_complexity),
            (names::CRAP_SCORE.to_string(), self.crap_score),
        ])
    }
}

fn default_cyclomatic_complexity() -> f64 {
    15.0
}

fn default_npath_complexity() -> f64 {
    200.0
}

fn default_crap_score() -> f64 {
    30.0
}

fn default_max_hotspots() -> usize {
    crate::analysis::DEFAULT_MAX_HOTSPOTS
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovmapConfig {
    #[serde(default)]
    pub thresholds: RiskThresholds,

    /// Maximum number of entries in the hotspot ranking.
    #[serde(default = "default_max_hotspots")]
    pub max_hotspots: usize,
}

impl Default for CovmapConfig {
    fn default() -> Self {
        Self {
            thresholds: RiskThresholds::default(),
            max_hotspots: default_max_hotspots(),
        }
    }
}

impl CovmapConfig {
    /// Loads `covmap.toml` from the given directory; absent file means
    /// defaults, a present-but-broken file is a hard error.
    pub fn load(directory: &Path) -> Result<Self, CovError> {
        let path = directory.join("covmap.toml");

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| CovError::io(&path, e))?;
        toml::from_str(&content).map_err(|e| CovError::Config {
            message: format!("{}: {e}", path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let thresholds = RiskThresholds::default();
        assert_eq!(thresholds.cyclomatic_complexity, 15.0);
        assert_eq!(thresholds.npath_complexity, 200.0);
        assert_eq!(thresholds.crap_score, 30.0);

        let map = thresholds.by_metric_name();
        assert_eq!(map[names::CRAP_SCORE], 30.0);
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = CovmapConfig::load(dir.path()).unwrap();
        assert_eq!(config.max_hotspots, 20);
    }

    #[test]
    fn test_load_partial_file_keeps_other_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("covmap.toml"),
            "max_hotspots = 5\n\n[thresholds]\ncrap_score = 42.0\n",
        )
        .unwrap();

        let config = CovmapConfig::load(dir.path()).unwrap();
        assert_eq!(config.max_hotspots, 5);
        assert_eq!(config.thresholds.crap_score, 42.0);
        assert_eq!(config.thresholds.cyclomatic_complexity, 15.0);
    }

    #[test]
    fn test_broken_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("covmap.toml"), "max_hotspots = [oops").unwrap();

        assert!(matches!(
            CovmapConfig::load(dir.path()),
            Err(CovError::Config { .. })
        ));
    }
}
