//! Routing of streamed partial payloads to per-request aggregators

use crate::aggregator::StagedAggregator;
use crate::config::StageConfig;
use crate::state::{IgnoreReason, StageOutcome};
use eza_normalize::{extract_analysis_id, NormalizeOptions};
use eza_types::{CanonicalResult, EzaError, EzaResult};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// A payload routed to its aggregator.
#[derive(Debug, Clone)]
pub struct RoutedUpdate {
    pub analysis_id: String,
    pub outcome: StageOutcome,
    /// Snapshot after the payload was applied. `None` when the payload was
    /// dropped for an analysis that already completed.
    pub result: Option<CanonicalResult>,
}

impl RoutedUpdate {
    pub fn is_ignored(&self) -> bool {
        matches!(self.outcome, StageOutcome::Ignored(_))
    }
}

/// Owns one [`StagedAggregator`] per analysis id.
///
/// Aggregators are removed as soon as they complete. Completed ids are
/// remembered (bounded by [`StageConfig::completed_id_memory`], oldest
/// forgotten first) so late duplicates are dropped with
/// [`IgnoreReason::AlreadyComplete`] instead of starting a fresh aggregator.
#[derive(Debug)]
pub struct StageRegistry {
    config: StageConfig,
    options: NormalizeOptions,
    active: HashMap<String, StagedAggregator>,
    completed: HashSet<String>,
    completed_order: VecDeque<String>,
}

impl StageRegistry {
    pub fn new(config: StageConfig) -> Self {
        Self::with_options(config, NormalizeOptions::default())
    }

    pub fn with_options(config: StageConfig, options: NormalizeOptions) -> Self {
        Self {
            config,
            options,
            active: HashMap::new(),
            completed: HashSet::new(),
            completed_order: VecDeque::new(),
        }
    }

    /// Route a payload by the analysis id it carries.
    pub fn apply(&mut self, payload: &Value) -> EzaResult<RoutedUpdate> {
        let analysis_id = extract_analysis_id(payload).ok_or_else(|| {
            EzaError::MalformedPayload("partial payload carries no analysis id".to_string())
        })?;
        self.apply_for(&analysis_id, payload)
    }

    /// Route a payload to an explicit analysis id.
    pub fn apply_for(&mut self, analysis_id: &str, payload: &Value) -> EzaResult<RoutedUpdate> {
        if self.completed.contains(analysis_id) {
            debug!(analysis_id = %analysis_id, "Dropping update for completed analysis");
            return Ok(RoutedUpdate {
                analysis_id: analysis_id.to_string(),
                outcome: StageOutcome::Ignored(IgnoreReason::AlreadyComplete),
                result: None,
            });
        }

        let options = &self.options;
        let aggregator = self
            .active
            .entry(analysis_id.to_string())
            .or_insert_with(|| StagedAggregator::with_options(analysis_id, options.clone()));
        let outcome = aggregator.apply(payload);

        if aggregator.is_complete() {
            let result = self
                .active
                .remove(analysis_id)
                .map(StagedAggregator::into_result);
            self.remember_completed(analysis_id);
            return Ok(RoutedUpdate {
                analysis_id: analysis_id.to_string(),
                outcome,
                result,
            });
        }

        Ok(RoutedUpdate {
            analysis_id: analysis_id.to_string(),
            outcome,
            result: Some(aggregator.snapshot().clone()),
        })
    }

    /// Complete an in-flight aggregator from what it has so far.
    pub fn finish(&mut self, analysis_id: &str) -> Option<CanonicalResult> {
        let mut aggregator = self.active.remove(analysis_id)?;
        aggregator.finish();
        self.remember_completed(analysis_id);
        Some(aggregator.into_result())
    }

    /// Current snapshot of an in-flight request.
    pub fn snapshot(&self, analysis_id: &str) -> Option<&CanonicalResult> {
        self.active.get(analysis_id).map(StagedAggregator::snapshot)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_completed(&self, analysis_id: &str) -> bool {
        self.completed.contains(analysis_id)
    }

    fn remember_completed(&mut self, analysis_id: &str) {
        if self.config.completed_id_memory == 0 {
            return;
        }
        if self.completed.insert(analysis_id.to_string()) {
            self.completed_order.push_back(analysis_id.to_string());
        }
        while self.completed_order.len() > self.config.completed_id_memory {
            if let Some(oldest) = self.completed_order.pop_front() {
                self.completed.remove(&oldest);
            }
        }
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new(StageConfig::default())
    }
}
