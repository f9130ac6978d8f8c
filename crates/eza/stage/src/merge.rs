//! Field merge rules for monotonic refinement
//!
//! Known incoming values replace prior ones, because the later stage is the
//! more complete one. Unknown or empty incoming values never erase what an
//! earlier stage established.

use eza_normalize::Stage;
use eza_types::CanonicalResult;
use serde_json::Value;

/// Merge a normalized payload of `stage` into `current`.
///
/// Immediate-score payloads only touch the score and risk level. Risk
/// summaries add intent, flags and risk locations. Full payloads may
/// touch every field.
pub fn merge_into(current: &mut CanonicalResult, incoming: CanonicalResult, stage: Stage) {
    if incoming.analysis_id.is_some() {
        current.analysis_id = incoming.analysis_id;
    }
    if incoming.overall_score.is_some() {
        current.overall_score = incoming.overall_score;
    }
    if incoming.risk_level.is_known() {
        current.risk_level = incoming.risk_level;
    }
    current.raw = incoming.raw;

    if stage < Stage::RiskSummary {
        return;
    }
    if incoming.intent.is_known() {
        current.intent = incoming.intent;
    }
    if !incoming.flags.is_empty() {
        current.flags = incoming.flags;
    }
    if !incoming.risk_locations.is_empty() {
        current.risk_locations = incoming.risk_locations;
    }

    if stage < Stage::Full {
        return;
    }
    for (name, value) in incoming.breakdown {
        // Requested-but-missing placeholders must not hide real data.
        if is_placeholder(&value) && current.breakdown.contains_key(&name) {
            continue;
        }
        current.breakdown.insert(name, value);
    }
}

fn is_placeholder(value: &Value) -> bool {
    value.as_object().is_some_and(|object| object.is_empty())
}
