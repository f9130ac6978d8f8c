//! Prioritized accessor tables over legacy field locations
//!
//! Every canonical field is looked up through an ordered list of paths.
//! The first path that resolves to a non-null, usable value wins. New
//! backend shapes are supported by adding a row here, never by optional
//! chaining at call sites.

use serde_json::Value;

/// A path into a JSON payload, outermost key first.
pub type FieldPath = &'static [&'static str];

/// Scale a score source is expressed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreScale {
    /// Already on 0-100.
    Percent,
    /// On 0-1, rescaled by `round(v * 100)`.
    Fraction,
}

impl ScoreScale {
    /// Convert a raw value on this scale to 0-100.
    ///
    /// A fraction-keyed value above 1 is already on the percent scale
    /// (some backend builds reuse `final_score` for both).
    pub fn to_percent(self, value: f64) -> f64 {
        let scaled = match self {
            ScoreScale::Percent => value,
            ScoreScale::Fraction if value <= 1.0 => (value * 100.0).round(),
            ScoreScale::Fraction => value,
        };
        scaled.clamp(0.0, 100.0)
    }
}

/// One legacy location of the overall score.
#[derive(Debug, Clone, Copy)]
pub struct ScoreSource {
    pub path: FieldPath,
    pub scale: ScoreScale,
}

impl ScoreSource {
    const fn percent(path: FieldPath) -> Self {
        Self {
            path,
            scale: ScoreScale::Percent,
        }
    }

    const fn fraction(path: FieldPath) -> Self {
        Self {
            path,
            scale: ScoreScale::Fraction,
        }
    }

    /// Read and rescale this source, if present.
    pub fn read(&self, payload: &Value) -> Option<f64> {
        lookup(payload, self.path)
            .and_then(as_number)
            .map(|v| self.scale.to_percent(v))
    }
}

/// Overall score locations, highest priority first.
pub const SCORE_SOURCES: &[ScoreSource] = &[
    ScoreSource::percent(&["eza_score", "eza_score"]),
    ScoreSource::fraction(&["eza_score", "final_score"]),
    ScoreSource::percent(&["analysis", "eza_score", "eza_score"]),
    ScoreSource::fraction(&["analysis", "eza_score", "final_score"]),
    ScoreSource::percent(&["_raw", "eza_score", "eza_score"]),
    ScoreSource::fraction(&["_raw", "eza_score", "final_score"]),
    ScoreSource::percent(&["overall_score"]),
    ScoreSource::percent(&["overallScore"]),
    ScoreSource::percent(&["eza_score"]),
    ScoreSource::percent(&["score"]),
    ScoreSource::fraction(&["final_score"]),
    ScoreSource::percent(&["immediate", "score"]),
    ScoreSource::percent(&["immediate", "eza_score"]),
    ScoreSource::fraction(&["immediate", "final_score"]),
    ScoreSource::percent(&["risk_summary", "score"]),
    ScoreSource::percent(&["analysis", "overall_score"]),
    ScoreSource::percent(&["_raw", "overall_score"]),
    ScoreSource::percent(&["_raw", "score"]),
];

/// Explicit risk level labels.
pub const RISK_LEVEL_SOURCES: &[FieldPath] = &[
    &["risk_level"],
    &["riskLevel"],
    &["immediate", "risk_level"],
    &["risk_summary", "risk_level"],
    &["analysis", "risk_level"],
    &["_raw", "risk_level"],
    &["eza_score", "risk_level"],
    &["analysis", "eza_score", "risk_level"],
];

/// Intent objects or labels.
pub const INTENT_SOURCES: &[FieldPath] = &[
    &["intent"],
    &["analysis", "intent"],
    &["_raw", "intent"],
    &["risk_summary", "intent"],
];

/// Flat intent label and score fallbacks.
pub const INTENT_LABEL_SOURCES: &[FieldPath] = &[&["intent_label"], &["analysis", "intent_label"]];
pub const INTENT_SCORE_SOURCES: &[FieldPath] = &[&["intent_score"], &["analysis", "intent_score"]];

/// Flag arrays.
pub const FLAG_SOURCES: &[FieldPath] = &[
    &["flags"],
    &["risk_flags"],
    &["risk_summary", "flags"],
    &["analysis", "flags"],
    &["_raw", "flags"],
];

/// Raw risk location arrays.
pub const RISK_LOCATION_SOURCES: &[FieldPath] = &[
    &["risk_locations"],
    &["riskLocations"],
    &["risk_summary", "risk_locations"],
    &["analysis", "risk_locations"],
    &["_raw", "risk_locations"],
];

/// Explicit breakdown objects.
pub const BREAKDOWN_SOURCES: &[FieldPath] = &[
    &["breakdown"],
    &["analysis", "breakdown"],
    &["_raw", "breakdown"],
];

/// Roots searched for loose sub-analysis objects when no breakdown exists.
pub const SUB_ANALYSIS_ROOTS: &[FieldPath] = &[&["analysis"], &["_raw"], &[]];

/// Sub-analysis names recognised outside an explicit breakdown.
pub const SUB_ANALYSIS_KEYS: &[&str] = &[
    "bias",
    "deception",
    "legal",
    "legal_risk",
    "psychological_pressure",
    "manipulation",
    "alignment",
    "output_analysis",
];

pub const COMPLETENESS_SOURCES: &[FieldPath] = &[&["completeness"], &["analysis", "completeness"]];

pub const ANALYSIS_ID_SOURCES: &[FieldPath] = &[
    &["analysis_id"],
    &["analysisId"],
    &["request_id"],
    &["requestId"],
    &["id"],
    &["analysis", "analysis_id"],
    &["_raw", "analysis_id"],
];

/// Resolve a path. Null counts as absent.
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// First value among `sources` for which `extract` yields something.
pub fn first_of<'a, T>(
    payload: &'a Value,
    sources: &[FieldPath],
    mut extract: impl FnMut(&'a Value) -> Option<T>,
) -> Option<T> {
    sources
        .iter()
        .filter_map(|path| lookup(payload, path))
        .find_map(|value| extract(value))
}

/// Finite number, accepting numeric strings.
pub fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Non-empty trimmed string, or a number rendered as text.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First text value among the given keys of an object.
pub fn text_field(object: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| lookup(object, &[*key]))
        .find_map(as_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_treats_null_as_absent() {
        let payload = json!({"a": {"b": null, "c": 3}});
        assert!(lookup(&payload, &["a", "b"]).is_none());
        assert_eq!(lookup(&payload, &["a", "c"]), Some(&json!(3)));
        assert!(lookup(&payload, &["a", "c", "d"]).is_none());
    }

    #[test]
    fn test_numeric_strings_accepted() {
        assert_eq!(as_number(&json!("  82.5 ")), Some(82.5));
        assert_eq!(as_number(&json!(true)), None);
        assert_eq!(as_number(&json!("n/a")), None);
    }

    #[test]
    fn test_fraction_scale() {
        assert_eq!(ScoreScale::Fraction.to_percent(0.41), 41.0);
        assert_eq!(ScoreScale::Fraction.to_percent(0.996), 100.0);
        assert_eq!(ScoreScale::Fraction.to_percent(64.0), 64.0);
        assert_eq!(ScoreScale::Percent.to_percent(130.0), 100.0);
    }

    #[test]
    fn test_nested_object_does_not_read_as_flat_score() {
        let payload = json!({"eza_score": {"eza_score": 82}});
        let flat = SCORE_SOURCES
            .iter()
            .find(|s| s.path == ["eza_score"])
            .unwrap();
        assert_eq!(flat.read(&payload), None);
    }
}
