//! Risk location grouping
//!
//! The backend reports one location per match, often repeating the same
//! pattern at several character offsets. Display surfaces want one entry
//! per underlying pattern.

use crate::access::{as_number, as_text, lookup, text_field};
use eza_types::{RiskLocation, Severity};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

const PATTERN_KEYS: &[&str] = &["pattern_id", "patternId", "pattern", "pattern_key"];
const KIND_KEYS: &[&str] = &["kind", "type", "category", "label"];
const SEVERITY_KEYS: &[&str] = &["severity", "level", "risk"];
const EVIDENCE_KEYS: &[&str] = &["evidence", "text", "excerpt", "snippet", "match"];
const POLICY_KEYS: &[&str] = &["policy_refs", "policyRefs", "policies", "policy"];

const UNKNOWN_KIND: &str = "unknown";

/// One location as reported by the backend, before grouping.
#[derive(Debug)]
struct RawLocation {
    key: String,
    pattern_id: String,
    kind: String,
    severity: Severity,
    evidence: Vec<String>,
    policy_refs: Vec<String>,
    occurrences: u32,
}

impl RawLocation {
    fn parse(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }

        let pattern = text_field(value, PATTERN_KEYS);
        let kind = text_field(value, KIND_KEYS);
        let evidence = string_list(value, EVIDENCE_KEYS);

        // Never group by raw offsets: pattern, then kind, then evidence text.
        let key = pattern
            .clone()
            .or_else(|| kind.clone())
            .or_else(|| evidence.first().cloned())
            .unwrap_or_else(|| UNKNOWN_KIND.to_string());

        let occurrences = lookup(value, &["occurrence_count"])
            .and_then(as_number)
            .filter(|n| *n >= 1.0)
            .map(|n| n as u32)
            .unwrap_or(1);

        Some(Self {
            pattern_id: pattern.unwrap_or_else(|| key.clone()),
            kind: kind.unwrap_or_else(|| UNKNOWN_KIND.to_string()),
            severity: parse_severity(value),
            evidence,
            policy_refs: string_list(value, POLICY_KEYS),
            occurrences,
            key,
        })
    }
}

fn parse_severity(value: &Value) -> Severity {
    SEVERITY_KEYS
        .iter()
        .filter_map(|key| lookup(value, &[*key]))
        .find_map(|v| match v {
            Value::String(label) => Severity::from_label(label),
            Value::Number(_) => as_number(v).map(severity_from_weight),
            _ => None,
        })
        .unwrap_or_default()
}

/// Numeric severities arrive either on 0-1 or 0-100.
fn severity_from_weight(weight: f64) -> Severity {
    let weight = if weight > 1.0 { weight / 100.0 } else { weight };
    if weight >= 0.7 {
        Severity::High
    } else if weight >= 0.4 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Strings from the first present key; accepts a single string, an array of
/// strings, or an array of objects carrying `id`/`ref`/`text`.
fn string_list(value: &Value, keys: &[&str]) -> Vec<String> {
    let Some(found) = keys.iter().find_map(|key| lookup(value, &[*key])) else {
        return Vec::new();
    };
    match found {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| as_text(item).or_else(|| text_field(item, &["id", "ref", "text"])))
            .collect(),
        other => as_text(other).into_iter().collect(),
    }
}

/// Merge raw locations sharing a risk pattern.
///
/// Groups keep first-appearance order. Severity is the maximum across the
/// group, policy references are unioned, evidence is de-duplicated and
/// occurrence counts are summed.
pub fn group_risk_locations(items: &[Value]) -> Vec<RiskLocation> {
    let mut grouped: Vec<RiskLocation> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for raw in items.iter().filter_map(RawLocation::parse) {
        match index.get(&raw.key) {
            Some(&i) => {
                let entry = &mut grouped[i];
                entry.severity = entry.severity.max(raw.severity);
                entry.occurrence_count = entry.occurrence_count.saturating_add(raw.occurrences);
                entry.policy_refs.extend(raw.policy_refs);
                for evidence in raw.evidence {
                    if !entry.evidence.contains(&evidence) {
                        entry.evidence.push(evidence);
                    }
                }
                if entry.kind == UNKNOWN_KIND && raw.kind != UNKNOWN_KIND {
                    entry.kind = raw.kind;
                }
            }
            None => {
                let mut evidence: Vec<String> = Vec::with_capacity(raw.evidence.len());
                for item in raw.evidence {
                    if !evidence.contains(&item) {
                        evidence.push(item);
                    }
                }
                index.insert(raw.key, grouped.len());
                grouped.push(RiskLocation {
                    pattern_id: raw.pattern_id,
                    kind: raw.kind,
                    severity: raw.severity,
                    evidence,
                    policy_refs: raw.policy_refs.into_iter().collect::<BTreeSet<_>>(),
                    occurrence_count: raw.occurrences,
                });
            }
        }
    }

    grouped
}
