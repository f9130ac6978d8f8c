//! EZA Normalize - response normalizer for the analysis backend
//!
//! The analysis backend has accreted many response shapes over time: flat
//! fields, scores nested under `eza_score`, whole analyses wrapped in
//! `analysis` or `_raw`, staged `immediate`/`risk_summary` envelopes. This
//! crate is the single quarantine point for all of them. Every caller gets
//! an [`eza_types::CanonicalResult`] back.
//!
//! ## Design
//!
//! - Each canonical field is resolved through a prioritized accessor table
//!   ([`access`]). The first location yielding a usable value wins.
//! - Scores keyed as fractions (`final_score`) are rescaled by
//!   `round(v * 100)`.
//! - Raw risk locations are grouped per pattern ([`locations`]).
//! - Normalization never fails. Unexpected input degrades to unknown or
//!   empty fields.
//!
//! ## Example
//!
//! ```
//! use eza_normalize::normalize;
//! use eza_types::RiskLevel;
//! use serde_json::json;
//!
//! let result = normalize(&json!({"analysis": {"eza_score": {"final_score": 0.41}}}));
//! assert_eq!(result.overall_score, Some(41.0));
//! assert_eq!(result.risk_level, RiskLevel::Medium);
//! ```

#![deny(unsafe_code)]

pub mod access;
pub mod fields;
pub mod locations;
pub mod options;
pub mod raw_shape;
pub mod shape;

pub use fields::{risk_level_for_score, LOW_RISK_FROM, MEDIUM_RISK_FROM};
pub use locations::group_risk_locations;
pub use options::NormalizeOptions;
pub use raw_shape::to_raw_shape;
pub use shape::{backend_error, extract_analysis_id, PayloadShape, Stage};

use eza_types::{CanonicalResult, Completeness};
use serde_json::Value;
use tracing::trace;

/// Normalize a backend payload with default options.
pub fn normalize(payload: &Value) -> CanonicalResult {
    normalize_with(payload, &NormalizeOptions::default())
}

/// Normalize a backend payload.
///
/// A payload that is not an object produces a complete result with every
/// field unknown: there is nothing more to learn from it.
pub fn normalize_with(payload: &Value, options: &NormalizeOptions) -> CanonicalResult {
    let shape = PayloadShape::classify(payload);
    trace!(shape = %shape, "Normalizing payload");

    if shape == PayloadShape::NotAnObject {
        return CanonicalResult::unavailable(payload.clone());
    }

    let mut result = CanonicalResult::empty(completeness(payload));
    let score = fields::overall_score(payload);
    result.set_overall_score(score);
    result.analysis_id = extract_analysis_id(payload);
    result.risk_level = fields::risk_level(payload, result.overall_score);
    result.intent = fields::intent(payload);
    result.flags = fields::flags(payload);
    result.risk_locations = group_risk_locations(fields::raw_locations(payload));
    result.breakdown = fields::breakdown(payload, &options.requested_breakdown);
    result.raw = payload.clone();
    result
}

/// Explicit label first. Payloads declaring an early stage are partial,
/// everything else is a terminal answer.
fn completeness(payload: &Value) -> Completeness {
    if let Some(explicit) = fields::explicit_completeness(payload) {
        return explicit;
    }
    match Stage::declared(payload) {
        Some(stage) if stage < Stage::Full => Completeness::Partial,
        _ => Completeness::Complete,
    }
}
