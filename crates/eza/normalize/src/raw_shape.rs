//! Encoder for the canonical raw shape

use eza_types::{CanonicalResult, RiskLocation};
use serde_json::{json, Map, Value};

/// Encode a result in the `Canonical` payload shape.
///
/// Normalizing the returned value yields a result equal to `result` in
/// every field except `raw`.
pub fn to_raw_shape(result: &CanonicalResult) -> Value {
    let mut object = Map::new();
    if let Some(id) = &result.analysis_id {
        object.insert("analysis_id".into(), Value::String(id.clone()));
    }
    object.insert(
        "overall_score".into(),
        result.overall_score.map_or(Value::Null, |s| json!(s)),
    );
    object.insert("risk_level".into(), json!(result.risk_level.as_str()));
    object.insert(
        "intent".into(),
        json!({"label": result.intent.label, "score": result.intent.score}),
    );
    object.insert("flags".into(), json!(result.flags));
    object.insert(
        "risk_locations".into(),
        Value::Array(result.risk_locations.iter().map(location_shape).collect()),
    );
    object.insert(
        "breakdown".into(),
        Value::Object(
            result
                .breakdown
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
    );
    object.insert("completeness".into(), json!(result.completeness.as_str()));
    Value::Object(object)
}

fn location_shape(location: &RiskLocation) -> Value {
    json!({
        "pattern_id": location.pattern_id,
        "kind": location.kind,
        "severity": location.severity.as_str(),
        "evidence": location.evidence,
        "policy_refs": location.policy_refs,
        "occurrence_count": location.occurrence_count,
    })
}
