//! Client-side record filtering, mirroring the history query filters

use eza_types::{CanonicalResult, RiskLevel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    /// Exact, case-sensitive flag match.
    #[serde(default)]
    pub flag: Option<String>,
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub max_score: Option<f64>,
    /// Leave out terminal error results.
    #[serde(default)]
    pub exclude_failures: bool,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_risk_level(mut self, level: RiskLevel) -> Self {
        self.risk_level = Some(level);
        self
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flag = Some(flag.into());
        self
    }

    pub fn with_score_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_score = min;
        self.max_score = max;
        self
    }

    pub fn excluding_failures(mut self) -> Self {
        self.exclude_failures = true;
        self
    }

    /// Score bounds only match records that carry a score.
    pub fn matches(&self, record: &CanonicalResult) -> bool {
        if self.exclude_failures && record.is_failure() {
            return false;
        }
        if self.risk_level.is_some_and(|level| record.risk_level != level) {
            return false;
        }
        if let Some(flag) = &self.flag {
            if !record.flags.iter().any(|f| f == flag) {
                return false;
            }
        }
        if self.min_score.is_some() || self.max_score.is_some() {
            let Some(score) = record.overall_score else {
                return false;
            };
            if self.min_score.is_some_and(|min| score < min)
                || self.max_score.is_some_and(|max| score > max)
            {
                return false;
            }
        }
        true
    }
}

/// Records matching `filter`, in input order.
pub fn filter_records<'a>(
    records: &'a [CanonicalResult],
    filter: &RecordFilter,
) -> Vec<&'a CanonicalResult> {
    records.iter().filter(|r| filter.matches(r)).collect()
}
