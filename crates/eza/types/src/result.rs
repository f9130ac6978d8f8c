//! Canonical analysis result model
//!
//! The single normalized shape consumed by every display surface. Values
//! are produced by `eza-normalize`, refined by `eza-stage`, and owned by
//! whichever view requested them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Breakdown key under which a failure message is stored.
pub const ERROR_KEY: &str = "error";

/// Coarse risk classification of analysed content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Unknown => "unknown",
        }
    }

    /// Parse a backend label. `unknown` and unrecognised labels yield `None`
    /// so callers can keep searching other locations.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" | "safe" | "minimal" | "none" => Some(RiskLevel::Low),
            "medium" | "moderate" | "mid" => Some(RiskLevel::Medium),
            "high" | "critical" | "severe" => Some(RiskLevel::High),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, RiskLevel::Unknown)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a single risk location or telemetry flag.
///
/// Ordering is `Low < Medium < High`, so `max` picks the more severe label.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" | "minor" | "info" => Some(Severity::Low),
            "medium" | "moderate" | "warning" | "warn" => Some(Severity::Medium),
            "high" | "critical" | "severe" | "error" => Some(Severity::High),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a result may still change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completeness {
    /// Fields may still be refined by a later stage.
    #[default]
    Partial,
    /// Immutable from here on.
    Complete,
}

impl Completeness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Completeness::Partial => "partial",
            Completeness::Complete => "complete",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "partial" | "pending" | "in_progress" => Some(Completeness::Partial),
            "complete" | "completed" | "final" | "done" => Some(Completeness::Complete),
            _ => None,
        }
    }
}

/// Detected intent of the analysed content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub label: String,
    pub score: Option<f64>,
}

impl Intent {
    pub const UNKNOWN_LABEL: &'static str = "unknown";

    pub fn unknown() -> Self {
        Self {
            label: Self::UNKNOWN_LABEL.to_string(),
            score: None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.label != Self::UNKNOWN_LABEL || self.score.is_some()
    }
}

impl Default for Intent {
    fn default() -> Self {
        Self::unknown()
    }
}

/// One risk pattern found in the content.
///
/// Raw backend locations sharing a pattern are merged into a single entry;
/// repeats are counted in `occurrence_count`, never duplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLocation {
    /// Underlying risk pattern identifier (grouping key).
    pub pattern_id: String,
    /// Category label of the pattern.
    pub kind: String,
    /// Most severe severity across merged locations.
    pub severity: Severity,
    /// Distinct evidence excerpts, in first-seen order.
    pub evidence: Vec<String>,
    /// Union of policy references.
    pub policy_refs: BTreeSet<String>,
    /// Number of raw locations merged into this entry.
    pub occurrence_count: u32,
}

/// The normalized analysis outcome for one piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalResult {
    /// Backend analysis id, when the payload carried one.
    pub analysis_id: Option<String>,
    /// Overall score on a 0-100 scale; `None` means not yet known.
    pub overall_score: Option<f64>,
    pub risk_level: RiskLevel,
    pub intent: Intent,
    /// Deduplicated, insertion order preserved.
    pub flags: Vec<String>,
    pub risk_locations: Vec<RiskLocation>,
    /// Named sub-analyses (bias, deception, legal, ...), opaque to the core.
    pub breakdown: BTreeMap<String, Value>,
    pub completeness: Completeness,
    /// Original backend payload, for audit and debug display only.
    pub raw: Value,
}

impl CanonicalResult {
    /// A result with every field at its unknown/default state.
    pub fn empty(completeness: Completeness) -> Self {
        Self {
            analysis_id: None,
            overall_score: None,
            risk_level: RiskLevel::Unknown,
            intent: Intent::unknown(),
            flags: Vec::new(),
            risk_locations: Vec::new(),
            breakdown: BTreeMap::new(),
            completeness,
            raw: Value::Null,
        }
    }

    /// Result for a payload that was not a usable object. There is nothing
    /// more to learn, so it is already complete.
    pub fn unavailable(raw: Value) -> Self {
        Self {
            raw,
            ..Self::empty(Completeness::Complete)
        }
    }

    /// Terminal "analysis failed" result carrying a human-readable message.
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        let mut result = Self::empty(Completeness::Complete);
        result
            .breakdown
            .insert(ERROR_KEY.to_string(), Value::String(message));
        result
    }

    pub fn is_complete(&self) -> bool {
        self.completeness == Completeness::Complete
    }

    /// Whether this is a terminal failure result.
    pub fn is_failure(&self) -> bool {
        self.is_complete() && self.breakdown.contains_key(ERROR_KEY)
    }

    /// The failure message, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.breakdown.get(ERROR_KEY).and_then(Value::as_str)
    }

    /// Set the overall score, clamping to `[0, 100]`. Non-finite values
    /// clear the score.
    pub fn set_overall_score(&mut self, score: Option<f64>) {
        self.overall_score = score
            .filter(|s| s.is_finite())
            .map(|s| s.clamp(0.0, 100.0));
    }

    /// Field-wise equality ignoring `raw`.
    pub fn content_eq(&self, other: &Self) -> bool {
        self.analysis_id == other.analysis_id
            && self.overall_score == other.overall_score
            && self.risk_level == other.risk_level
            && self.intent == other.intent
            && self.flags == other.flags
            && self.risk_locations == other.risk_locations
            && self.breakdown == other.breakdown
            && self.completeness == other.completeness
    }
}

impl Default for CanonicalResult {
    fn default() -> Self {
        Self::empty(Completeness::Partial)
    }
}
