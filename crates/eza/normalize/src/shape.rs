//! Known backend payload shapes and stage classification

use crate::access::{as_number, as_text, first_of, lookup, text_field, ANALYSIS_ID_SOURCES};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Historically-evolved shapes the analysis backend answers in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
    /// Our own raw encoding (`overall_score` + `completeness`).
    Canonical,
    /// Progressive stage message (`stage`, `immediate` or `risk_summary`).
    Staged,
    /// Full analysis wrapped in an `analysis` object.
    AnalysisEnvelope,
    /// Legacy proxy answer wrapping everything in `_raw`.
    RawEnvelope,
    /// Score object under `eza_score`.
    NestedScore,
    /// Flat top-level score or risk fields.
    Flat,
    /// An object carrying none of the known keys.
    Unknown,
    /// Not a JSON object at all.
    NotAnObject,
}

const FLAT_KEYS: &[&str] = &[
    "overall_score",
    "overallScore",
    "eza_score",
    "score",
    "final_score",
    "risk_level",
    "riskLevel",
    "flags",
    "risk_locations",
    "intent",
    "breakdown",
];

impl PayloadShape {
    /// Classify a payload. Checks run from most to least specific.
    pub fn classify(payload: &Value) -> Self {
        let Some(object) = payload.as_object() else {
            return PayloadShape::NotAnObject;
        };
        let has_object = |key: &str| object.get(key).is_some_and(Value::is_object);

        if object.contains_key("completeness") && object.contains_key("overall_score") {
            PayloadShape::Canonical
        } else if object.contains_key("stage")
            || has_object("immediate")
            || has_object("risk_summary")
        {
            PayloadShape::Staged
        } else if has_object("analysis") {
            PayloadShape::AnalysisEnvelope
        } else if has_object("_raw") {
            PayloadShape::RawEnvelope
        } else if has_object("eza_score") {
            PayloadShape::NestedScore
        } else if FLAT_KEYS.iter().any(|key| lookup(payload, &[*key]).is_some()) {
            PayloadShape::Flat
        } else {
            PayloadShape::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadShape::Canonical => "canonical",
            PayloadShape::Staged => "staged",
            PayloadShape::AnalysisEnvelope => "analysis_envelope",
            PayloadShape::RawEnvelope => "raw_envelope",
            PayloadShape::NestedScore => "nested_score",
            PayloadShape::Flat => "flat",
            PayloadShape::Unknown => "unknown",
            PayloadShape::NotAnObject => "not_an_object",
        }
    }
}

impl fmt::Display for PayloadShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage of a progressive response. Ordered by completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Only the overall score and risk level are trustworthy.
    ImmediateScore,
    /// Score, risk level, flags, risk locations and intent.
    RiskSummary,
    /// Everything the backend can supply.
    Full,
}

impl Stage {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "immediate" | "immediate_score" | "score" | "fast" => Some(Stage::ImmediateScore),
            "risk_summary" | "summary" | "risk" => Some(Stage::RiskSummary),
            "full" | "complete" | "final" | "deep" | "analysis" => Some(Stage::Full),
            _ => None,
        }
    }

    /// Stage the payload declares about itself, explicitly or through a
    /// stage envelope object.
    pub fn declared(payload: &Value) -> Option<Self> {
        if let Some(stage) = lookup(payload, &["stage"])
            .and_then(as_text)
            .and_then(|label| Stage::from_label(&label))
        {
            return Some(stage);
        }
        let has_object = |key: &str| lookup(payload, &[key]).is_some_and(Value::is_object);
        if has_object("analysis") || has_object("breakdown") {
            None
        } else if has_object("risk_summary") {
            Some(Stage::RiskSummary)
        } else if has_object("immediate") {
            Some(Stage::ImmediateScore)
        } else {
            None
        }
    }

    /// Stage of a streamed partial payload. Undeclared payloads carrying
    /// nothing but identifiers and a score count as immediate scores.
    pub fn classify(payload: &Value) -> Self {
        if let Some(stage) = Stage::declared(payload) {
            return stage;
        }
        match payload.as_object() {
            Some(object) if !object.is_empty() && object.keys().all(|k| is_score_only_key(k)) => {
                Stage::ImmediateScore
            }
            _ => Stage::Full,
        }
    }
}

fn is_score_only_key(key: &str) -> bool {
    matches!(
        key,
        "analysis_id"
            | "analysisId"
            | "request_id"
            | "requestId"
            | "id"
            | "eza_score"
            | "overall_score"
            | "overallScore"
            | "score"
            | "final_score"
            | "risk_level"
            | "riskLevel"
    )
}

/// Analysis/request identifier carried by a payload.
pub fn extract_analysis_id(payload: &Value) -> Option<String> {
    first_of(payload, ANALYSIS_ID_SOURCES, as_text)
}

/// Error message when the backend reported a failure inside a payload.
pub fn backend_error(payload: &Value) -> Option<String> {
    const MESSAGE_KEYS: &[&str] = &["message", "detail", "error_message", "reason"];

    match lookup(payload, &["error"]) {
        Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
        Some(Value::Bool(true)) => {
            return Some(
                text_field(payload, MESSAGE_KEYS)
                    .unwrap_or_else(|| "backend reported an error".to_string()),
            )
        }
        Some(err @ Value::Object(_)) => {
            return Some(text_field(err, MESSAGE_KEYS).unwrap_or_else(|| err.to_string()))
        }
        _ => {}
    }

    if lookup(payload, &["ok"]) == Some(&Value::Bool(false))
        || lookup(payload, &["success"]) == Some(&Value::Bool(false))
    {
        return Some(
            text_field(payload, MESSAGE_KEYS)
                .unwrap_or_else(|| "backend reported failure".to_string()),
        );
    }

    let status = lookup(payload, &["status"]).and_then(as_text);
    if matches!(status.as_deref(), Some("error") | Some("failed") | Some("failure")) {
        return Some(
            text_field(payload, MESSAGE_KEYS)
                .unwrap_or_else(|| "backend reported failure".to_string()),
        );
    }

    // Some gateways report HTTP-ish codes inline.
    if let Some(code) = lookup(payload, &["status_code"]).and_then(as_number) {
        if code >= 400.0 {
            return Some(
                text_field(payload, MESSAGE_KEYS)
                    .unwrap_or_else(|| format!("backend returned status {}", code)),
            );
        }
    }

    None
}
