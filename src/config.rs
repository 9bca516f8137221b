use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::PipelineError;
use crate::types::MetricSet;

/// Metric a ranking is sorted by (ascending, worst first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RankMetric {
    #[default]
    Aer,
    Aebi,
    Caes,
}

impl RankMetric {
    pub fn value(&self, m: &MetricSet) -> f64 {
        match self {
            RankMetric::Aer => m.aer,
            RankMetric::Aebi => m.aebi,
            RankMetric::Caes => m.caes,
        }
    }
}

impl fmt::Display for RankMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankMetric::Aer => write!(f, "aer"),
            RankMetric::Aebi => write!(f, "aebi"),
            RankMetric::Caes => write!(f, "caes"),
        }
    }
}

impl FromStr for RankMetric {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aer" => Ok(RankMetric::Aer),
            "aebi" => Ok(RankMetric::Aebi),
            "caes" => Ok(RankMetric::Caes),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown ranking metric '{}' (expected aer, aebi or caes)",
                other
            ))),
        }
    }
}

/// Cumulative rank-percentile cutoffs for district priority:
/// `rank <= n * high` is HIGH, `rank <= n * medium` is MEDIUM, the rest LOW.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrioritySplit {
    pub high: f64,
    pub medium: f64,
}

impl Default for PrioritySplit {
    fn default() -> Self {
        Self { high: 0.3, medium: 0.7 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub rank_metric: RankMetric,
    pub pin_min_enrollments: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_top_n: Option<usize>,
    pub zone_aer_threshold: f64,
    pub zone_min_enrollments: u64,
    pub variation_min_pincodes: usize,
    pub aggregate_monthly: bool,
    pub max_reasonable_enrollment: u64,
    pub default_state: String,
    pub priority_split: PrioritySplit,
    /// Extra district spellings mapped onto canonical names.
    pub district_aliases: BTreeMap<String, String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rank_metric: RankMetric::Aer,
            pin_min_enrollments: 10,
            pin_top_n: None,
            zone_aer_threshold: 0.01,
            zone_min_enrollments: 50,
            variation_min_pincodes: 5,
            aggregate_monthly: false,
            max_reasonable_enrollment: 10_000,
            default_state: "Telangana".to_string(),
            priority_split: PrioritySplit::default(),
            district_aliases: BTreeMap::new(),
        }
    }
}

impl PipelineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PipelineError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let PrioritySplit { high, medium } = self.priority_split;
        if !(0.0..=1.0).contains(&high) || !(0.0..=1.0).contains(&medium) || high > medium {
            return Err(PipelineError::InvalidConfig(format!(
                "priority_split must satisfy 0 <= high <= medium <= 1 (got high={}, medium={})",
                high, medium
            )));
        }
        if !self.zone_aer_threshold.is_finite() || self.zone_aer_threshold < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "zone_aer_threshold must be a non-negative number (got {})",
                self.zone_aer_threshold
            )));
        }
        if self.pin_top_n == Some(0) {
            return Err(PipelineError::InvalidConfig(
                "pin_top_n must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}
