//! Dashboard aggregation over canonical results
//!
//! Snapshots are always recomputed from the full batch. Nothing here keeps
//! state between calls, so counts never depend on arrival order.

use crate::config::{AggregationConfig, RiskBand};
use crate::frequency::{FrequencyEntry, FrequencyTable};
use eza_types::{CanonicalResult, RiskLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Records per risk band. Every record lands in exactly one band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl BandCounts {
    fn add(&mut self, band: RiskBand) {
        match band {
            RiskBand::Low => self.low += 1,
            RiskBand::Medium => self.medium += 1,
            RiskBand::High => self.high += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }
}

/// Records per reported risk level, unknown included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskLevelCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub unknown: usize,
}

impl RiskLevelCounts {
    fn add(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::High => self.high += 1,
            RiskLevel::Unknown => self.unknown += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub total: usize,
    pub bands: BandCounts,
    /// Mean over records that carry a score.
    pub average_score: Option<f64>,
    /// Records without a score (banded with the assumed score).
    pub missing_scores: usize,
    /// Records that are terminal error results.
    pub failures: usize,
    pub risk_levels: RiskLevelCounts,
    pub distinct_flags: usize,
    pub distinct_policies: usize,
    /// Flags by number of records carrying them.
    pub flag_frequencies: Vec<FrequencyEntry>,
    /// Policy references by number of records citing them.
    pub policy_frequencies: Vec<FrequencyEntry>,
}

/// Aggregate with the default configuration.
pub fn aggregate<'a, I>(records: I) -> AggregateSnapshot
where
    I: IntoIterator<Item = &'a CanonicalResult>,
{
    aggregate_with(records, &AggregationConfig::default())
}

pub fn aggregate_with<'a, I>(records: I, config: &AggregationConfig) -> AggregateSnapshot
where
    I: IntoIterator<Item = &'a CanonicalResult>,
{
    let mut snapshot = AggregateSnapshot::default();
    let mut flags = FrequencyTable::new();
    let mut policies = FrequencyTable::new();
    let mut score_sum = 0.0;
    let mut scored = 0usize;

    for record in records {
        snapshot.total += 1;
        snapshot.bands.add(config.band(record.overall_score));
        snapshot.risk_levels.add(record.risk_level);

        match record.overall_score {
            Some(score) => {
                score_sum += score;
                scored += 1;
            }
            None => snapshot.missing_scores += 1,
        }
        if record.is_failure() {
            snapshot.failures += 1;
        }

        for flag in &record.flags {
            flags.record(flag);
        }
        // A record cites a policy once, however many locations reference it.
        let cited: BTreeSet<&str> = record
            .risk_locations
            .iter()
            .flat_map(|location| location.policy_refs.iter().map(String::as_str))
            .collect();
        for policy in cited {
            policies.record(policy);
        }
    }

    snapshot.average_score = (scored > 0).then(|| score_sum / scored as f64);
    snapshot.distinct_flags = flags.distinct();
    snapshot.distinct_policies = policies.distinct();
    snapshot.flag_frequencies = flags.into_sorted();
    snapshot.policy_frequencies = policies.into_sorted();

    debug!(
        total = snapshot.total,
        missing_scores = snapshot.missing_scores,
        "Aggregated analysis records"
    );
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use eza_types::{Completeness, RiskLocation, Severity};

    fn record(score: Option<f64>, level: RiskLevel, flags: &[&str]) -> CanonicalResult {
        let mut result = CanonicalResult::empty(Completeness::Complete);
        result.overall_score = score;
        result.risk_level = level;
        result.flags = flags.iter().map(|f| f.to_string()).collect();
        result
    }

    fn location(policies: &[&str]) -> RiskLocation {
        RiskLocation {
            pattern_id: "P1".into(),
            kind: "manipulation".into(),
            severity: Severity::Medium,
            evidence: Vec::new(),
            policy_refs: policies.iter().map(|p| p.to_string()).collect(),
            occurrence_count: 1,
        }
    }

    #[test]
    fn test_bands_and_missing_scores() {
        let records = vec![
            record(Some(90.0), RiskLevel::Low, &[]),
            record(Some(10.0), RiskLevel::High, &[]),
            record(None, RiskLevel::Unknown, &[]),
            CanonicalResult::failed("connection reset"),
        ];
        let snapshot = aggregate(&records);
        assert_eq!(snapshot.total, 4);
        assert_eq!(
            snapshot.bands,
            BandCounts {
                low: 1,
                medium: 2,
                high: 1
            }
        );
        assert_eq!(snapshot.bands.total(), 4);
        assert_eq!(snapshot.missing_scores, 2);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.average_score, Some(50.0));
        assert_eq!(snapshot.risk_levels.unknown, 2);
    }

    #[test]
    fn test_flag_and_policy_tables() {
        let mut cited = record(Some(60.0), RiskLevel::Medium, &["urgency", "pii"]);
        cited.risk_locations = vec![location(&["DSA-25", "EU-AI-5"]), location(&["DSA-25"])];
        let records = vec![
            record(Some(70.0), RiskLevel::Medium, &["pii"]),
            cited,
            record(Some(75.0), RiskLevel::Medium, &["Pii", "urgency"]),
        ];

        let snapshot = aggregate(&records);
        assert_eq!(snapshot.distinct_flags, 3);
        let flags: Vec<_> = snapshot
            .flag_frequencies
            .iter()
            .map(|e| (e.value.as_str(), e.count))
            .collect();
        assert_eq!(flags, vec![("pii", 2), ("urgency", 2), ("Pii", 1)]);

        assert_eq!(snapshot.distinct_policies, 2);
        assert_eq!(snapshot.policy_frequencies[0].value, "DSA-25");
        assert_eq!(snapshot.policy_frequencies[0].count, 1);
    }

    #[test]
    fn test_empty_batch() {
        let snapshot = aggregate(&Vec::<CanonicalResult>::new());
        assert_eq!(snapshot.total, 0);
        assert_eq!(snapshot.average_score, None);
        assert!(snapshot.flag_frequencies.is_empty());
    }

    #[test]
    fn test_accepts_filtered_references() {
        let records = vec![record(Some(20.0), RiskLevel::High, &[])];
        let refs: Vec<&CanonicalResult> = records.iter().collect();
        assert_eq!(aggregate(refs).bands.high, 1);
    }
}
