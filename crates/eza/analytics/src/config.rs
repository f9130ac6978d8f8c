//! Aggregation configuration

use serde::{Deserialize, Serialize};

/// Risk band of a single record on dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

/// Banding thresholds and the score assumed for unscored records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Score used for records without one, so they still land in a band.
    #[serde(default = "default_assumed_score")]
    pub assumed_score: f64,

    /// Scores below this are high risk.
    #[serde(default = "default_high_below")]
    pub high_below: f64,

    /// Scores at or above this are low risk.
    #[serde(default = "default_low_from")]
    pub low_from: f64,
}

fn default_assumed_score() -> f64 {
    50.0
}

fn default_high_below() -> f64 {
    50.0
}

fn default_low_from() -> f64 {
    80.0
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            assumed_score: default_assumed_score(),
            high_below: default_high_below(),
            low_from: default_low_from(),
        }
    }
}

impl AggregationConfig {
    pub fn band(&self, score: Option<f64>) -> RiskBand {
        let score = score.unwrap_or(self.assumed_score);
        if score < self.high_below {
            RiskBand::High
        } else if score < self.low_from {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }

    pub fn thresholds_ordered(&self) -> bool {
        self.high_below <= self.low_from
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_edges() {
        let config = AggregationConfig::default();
        assert_eq!(config.band(Some(49.9)), RiskBand::High);
        assert_eq!(config.band(Some(50.0)), RiskBand::Medium);
        assert_eq!(config.band(Some(79.0)), RiskBand::Medium);
        assert_eq!(config.band(Some(80.0)), RiskBand::Low);
        assert_eq!(config.band(None), RiskBand::Medium);
    }

    #[test]
    fn test_assumed_score_is_configurable() {
        let config = AggregationConfig {
            assumed_score: 10.0,
            ..AggregationConfig::default()
        };
        assert_eq!(config.band(None), RiskBand::High);
        assert!(config.thresholds_ordered());
    }
}
