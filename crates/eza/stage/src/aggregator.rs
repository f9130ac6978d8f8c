//! Per-request staged result aggregator

use crate::merge::merge_into;
use crate::state::{AggregatorState, IgnoreReason, StageOutcome};
use eza_normalize::{normalize_with, NormalizeOptions, Stage};
use eza_types::{CanonicalResult, Completeness};
use serde_json::Value;
use tracing::debug;

/// Working state is dropped once the aggregator completes; only the frozen
/// result survives.
#[derive(Debug, Clone)]
enum Inner {
    Working {
        state: AggregatorState,
        current: CanonicalResult,
    },
    Finished(CanonicalResult),
}

/// Combines the partial payloads of one logical request into one
/// progressively-completing [`CanonicalResult`].
///
/// Each request owns its own aggregator. Payloads are applied strictly in
/// arrival order.
#[derive(Debug, Clone)]
pub struct StagedAggregator {
    request_id: String,
    options: NormalizeOptions,
    inner: Inner,
}

impl StagedAggregator {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self::with_options(request_id, NormalizeOptions::default())
    }

    pub fn with_options(request_id: impl Into<String>, options: NormalizeOptions) -> Self {
        Self {
            request_id: request_id.into(),
            options,
            inner: Inner::Working {
                state: AggregatorState::AwaitingFirstStage,
                current: CanonicalResult::empty(Completeness::Partial),
            },
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn state(&self) -> AggregatorState {
        match &self.inner {
            Inner::Working { state, .. } => *state,
            Inner::Finished(_) => AggregatorState::Complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.inner, Inner::Finished(_))
    }

    /// What is known right now.
    pub fn snapshot(&self) -> &CanonicalResult {
        match &self.inner {
            Inner::Working { current, .. } => current,
            Inner::Finished(result) => result,
        }
    }

    /// Consume the aggregator, returning its current result.
    pub fn into_result(self) -> CanonicalResult {
        match self.inner {
            Inner::Working { current, .. } => current,
            Inner::Finished(result) => result,
        }
    }

    /// Apply a streamed partial payload, classifying its stage from its
    /// content.
    pub fn apply(&mut self, payload: &Value) -> StageOutcome {
        self.apply_stage(payload, Stage::classify(payload))
    }

    /// Apply a payload known to be the last one for this request, as from a
    /// transport that answers with a single terminal body.
    pub fn apply_terminal(&mut self, payload: &Value) -> StageOutcome {
        self.apply_stage(payload, Stage::Full)
    }

    /// Apply a payload of an explicit stage.
    pub fn apply_stage(&mut self, payload: &Value, stage: Stage) -> StageOutcome {
        let Inner::Working { state, current } = &mut self.inner else {
            debug!(
                request_id = %self.request_id,
                "Ignoring update for completed request"
            );
            return StageOutcome::Ignored(IgnoreReason::AlreadyComplete);
        };

        let from = *state;
        let to = AggregatorState::after(stage);
        if to < from {
            debug!(
                request_id = %self.request_id,
                state = %from,
                stage = ?stage,
                "Ignoring payload from an older stage"
            );
            return StageOutcome::Ignored(IgnoreReason::OlderStage);
        }

        let incoming = normalize_with(payload, &self.options);
        merge_into(current, incoming, stage);
        *state = to;

        if to == AggregatorState::Complete {
            self.complete();
            return StageOutcome::Completed;
        }

        debug!(
            request_id = %self.request_id,
            from = %from,
            to = %to,
            "Stage applied"
        );
        if to == from {
            StageOutcome::Refined
        } else {
            StageOutcome::Advanced(to)
        }
    }

    /// Complete from current knowledge, for streams that end without an
    /// explicit full stage.
    pub fn finish(&mut self) -> StageOutcome {
        if self.is_complete() {
            return StageOutcome::Ignored(IgnoreReason::AlreadyComplete);
        }
        self.complete();
        StageOutcome::Completed
    }

    fn complete(&mut self) {
        let placeholder = Inner::Finished(CanonicalResult::empty(Completeness::Complete));
        if let Inner::Working { mut current, .. } = std::mem::replace(&mut self.inner, placeholder)
        {
            current.completeness = Completeness::Complete;
            debug!(request_id = %self.request_id, "Request complete");
            self.inner = Inner::Finished(current);
        }
    }
}
