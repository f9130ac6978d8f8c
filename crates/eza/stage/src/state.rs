//! Aggregator states and outcomes

use eza_normalize::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of one request through the staged protocol.
///
/// States only ever move forward:
/// `AwaitingFirstStage -> HaveImmediateScore -> HaveRiskSummary -> Complete`.
/// Stages may be skipped, but never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregatorState {
    /// Nothing received yet.
    AwaitingFirstStage,
    /// Score and risk level are known, everything else may still change.
    HaveImmediateScore,
    /// Flags, risk locations and intent are known too.
    HaveRiskSummary,
    /// Final. No further updates are accepted.
    Complete,
}

impl AggregatorState {
    /// State reached once a payload of `stage` has been merged.
    pub fn after(stage: Stage) -> Self {
        match stage {
            Stage::ImmediateScore => AggregatorState::HaveImmediateScore,
            Stage::RiskSummary => AggregatorState::HaveRiskSummary,
            Stage::Full => AggregatorState::Complete,
        }
    }

    /// Stage whose payload produced this state, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            AggregatorState::AwaitingFirstStage => None,
            AggregatorState::HaveImmediateScore => Some(Stage::ImmediateScore),
            AggregatorState::HaveRiskSummary => Some(Stage::RiskSummary),
            AggregatorState::Complete => Some(Stage::Full),
        }
    }
}

impl fmt::Display for AggregatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregatorState::AwaitingFirstStage => write!(f, "awaiting-first-stage"),
            AggregatorState::HaveImmediateScore => write!(f, "have-immediate-score"),
            AggregatorState::HaveRiskSummary => write!(f, "have-risk-summary"),
            AggregatorState::Complete => write!(f, "complete"),
        }
    }
}

/// Why a payload was not merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// The payload belongs to a stage older than the current one.
    OlderStage,
    /// The aggregator already completed.
    AlreadyComplete,
}

/// Result of feeding one payload to an aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// Moved to a later, still partial state.
    Advanced(AggregatorState),
    /// Same stage repeated; fields were refined in place.
    Refined,
    /// Reached `Complete`.
    Completed,
    /// Dropped without touching the result.
    Ignored(IgnoreReason),
}

impl StageOutcome {
    /// Whether the visible result may have changed.
    pub fn changed(&self) -> bool {
        !matches!(self, StageOutcome::Ignored(_))
    }
}
