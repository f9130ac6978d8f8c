//! Per-field extraction over the accessor tables

use crate::access::{
    as_number, as_text, first_of, lookup, text_field, BREAKDOWN_SOURCES, COMPLETENESS_SOURCES,
    FLAG_SOURCES, INTENT_LABEL_SOURCES, INTENT_SCORE_SOURCES, INTENT_SOURCES,
    RISK_LEVEL_SOURCES, SCORE_SOURCES, SUB_ANALYSIS_KEYS, SUB_ANALYSIS_ROOTS,
};
use eza_types::{Completeness, Intent, RiskLevel};
use serde_json::Value;
use std::collections::BTreeMap;

/// Scores at or above this are low risk.
pub const LOW_RISK_FROM: f64 = 70.0;
/// Scores at or above this (and below [`LOW_RISK_FROM`]) are medium risk.
pub const MEDIUM_RISK_FROM: f64 = 40.0;

pub fn overall_score(payload: &Value) -> Option<f64> {
    SCORE_SOURCES.iter().find_map(|source| source.read(payload))
}

/// Explicit label first, otherwise derived from the score.
pub fn risk_level(payload: &Value, score: Option<f64>) -> RiskLevel {
    first_of(payload, RISK_LEVEL_SOURCES, |v| {
        as_text(v).and_then(|label| RiskLevel::from_label(&label))
    })
    .or_else(|| score.map(risk_level_for_score))
    .unwrap_or(RiskLevel::Unknown)
}

/// Risk level implied by a 0-100 score (higher score, lower risk).
pub fn risk_level_for_score(score: f64) -> RiskLevel {
    if score >= LOW_RISK_FROM {
        RiskLevel::Low
    } else if score >= MEDIUM_RISK_FROM {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

pub fn intent(payload: &Value) -> Intent {
    if let Some(intent) = first_of(payload, INTENT_SOURCES, parse_intent) {
        return intent;
    }
    let label = first_of(payload, INTENT_LABEL_SOURCES, as_text);
    let score = first_of(payload, INTENT_SCORE_SOURCES, as_number);
    Intent {
        label: label.unwrap_or_else(|| Intent::UNKNOWN_LABEL.to_string()),
        score,
    }
}

fn parse_intent(value: &Value) -> Option<Intent> {
    match value {
        Value::String(_) => as_text(value).map(|label| Intent { label, score: None }),
        Value::Object(_) => {
            let label = text_field(value, &["label", "primary", "type", "name"]);
            let score = ["score", "confidence"]
                .iter()
                .find_map(|key| lookup(value, &[*key]).and_then(as_number));
            if label.is_none() && score.is_none() {
                return None;
            }
            Some(Intent {
                label: label.unwrap_or_else(|| Intent::UNKNOWN_LABEL.to_string()),
                score,
            })
        }
        _ => None,
    }
}

/// Deduplicated flags, first occurrence wins.
pub fn flags(payload: &Value) -> Vec<String> {
    let Some(items) = first_of(payload, FLAG_SOURCES, Value::as_array) else {
        return Vec::new();
    };
    let mut flags: Vec<String> = Vec::with_capacity(items.len());
    for flag in items
        .iter()
        .filter_map(|item| as_text(item).or_else(|| text_field(item, &["type", "name", "flag", "label"])))
    {
        if !flags.contains(&flag) {
            flags.push(flag);
        }
    }
    flags
}

pub fn raw_locations(payload: &Value) -> &[Value] {
    first_of(payload, crate::access::RISK_LOCATION_SOURCES, |v| {
        v.as_array().map(Vec::as_slice)
    })
    .unwrap_or(&[])
}

/// Explicit breakdown object, else loose sub-analyses gathered from the
/// known roots. Requested names are always present.
pub fn breakdown(payload: &Value, requested: &[String]) -> BTreeMap<String, Value> {
    let mut breakdown: BTreeMap<String, Value> =
        match first_of(payload, BREAKDOWN_SOURCES, Value::as_object) {
            Some(object) => object
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            None => SUB_ANALYSIS_KEYS
                .iter()
                .filter_map(|key| {
                    SUB_ANALYSIS_ROOTS
                        .iter()
                        .find_map(|root| {
                            let mut path: Vec<&str> = root.to_vec();
                            path.push(*key);
                            lookup(payload, &path).cloned()
                        })
                        .map(|value| (key.to_string(), value))
                })
                .collect(),
        };

    for name in requested {
        breakdown
            .entry(name.clone())
            .or_insert_with(|| Value::Object(Default::default()));
    }
    breakdown
}

pub fn explicit_completeness(payload: &Value) -> Option<Completeness> {
    first_of(payload, COMPLETENESS_SOURCES, |v| {
        as_text(v).and_then(|label| Completeness::from_label(&label))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_score_priority_prefers_nested_object() {
        let payload = json!({"eza_score": {"eza_score": 64, "final_score": 0.9}, "score": 10});
        assert_eq!(overall_score(&payload), Some(64.0));
    }

    #[test]
    fn test_score_falls_back_past_nulls() {
        let payload = json!({"eza_score": {"eza_score": null, "final_score": 0.255}});
        assert_eq!(overall_score(&payload), Some(26.0));
    }

    #[test]
    fn test_explicit_risk_level_beats_score() {
        let payload = json!({"risk_level": "HIGH", "score": 95});
        assert_eq!(risk_level(&payload, Some(95.0)), RiskLevel::High);
        let unlabeled = json!({"risk_level": "unknown"});
        assert_eq!(risk_level(&unlabeled, Some(55.0)), RiskLevel::Medium);
        assert_eq!(risk_level(&unlabeled, None), RiskLevel::Unknown);
    }

    #[test]
    fn test_intent_variants() {
        assert_eq!(intent(&json!({"intent": "persuade"})).label, "persuade");
        let nested = intent(&json!({"analysis": {"intent": {"primary": "inform", "confidence": 0.8}}}));
        assert_eq!(nested.label, "inform");
        assert_eq!(nested.score, Some(0.8));
        let flat = intent(&json!({"intent_label": "sell", "intent_score": "0.3"}));
        assert_eq!(flat.label, "sell");
        assert_eq!(flat.score, Some(0.3));
        assert_eq!(intent(&json!({})), Intent::unknown());
    }

    #[test]
    fn test_flags_are_deduplicated_in_order() {
        let payload = json!({"flags": ["pii", {"type": "bias"}, "pii", 7, null]});
        assert_eq!(flags(&payload), vec!["pii", "bias", "7"]);
    }

    #[test]
    fn test_breakdown_collects_loose_sub_analyses() {
        let payload = json!({
            "analysis": {"bias": {"score": 0.2}},
            "deception": {"score": 0.1}
        });
        let breakdown = breakdown(&payload, &["legal".to_string()]);
        assert_eq!(breakdown["bias"], json!({"score": 0.2}));
        assert_eq!(breakdown["deception"], json!({"score": 0.1}));
        assert_eq!(breakdown["legal"], json!({}));
        assert_eq!(breakdown.len(), 3);
    }

    #[test]
    fn test_explicit_breakdown_wins() {
        let payload = json!({"breakdown": {"legal": {"ok": true}}, "bias": {"score": 1}});
        let breakdown = breakdown(&payload, &[]);
        assert_eq!(breakdown.len(), 1);
        assert!(breakdown.contains_key("legal"));
    }
}
