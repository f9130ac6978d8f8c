//! Lenient parsing of inbound feed messages

use chrono::{DateTime, TimeZone, Utc};
use eza_normalize::access::{as_number, as_text, lookup, text_field};
use eza_types::{
    EzaError, EzaResult, PipelineHealth, PipelineStatus, Severity, TelemetryEvent, TelemetryFlag,
};
use serde_json::Value;

/// One parsed message from the event feed.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryMessage {
    /// A risk event sample.
    Event(TelemetryEvent),
    /// Pipeline health report.
    Health(PipelineHealth),
    /// Keep-alive; carries nothing.
    Heartbeat,
}

const TYPE_KEYS: &[&str] = &["type", "kind", "event_type"];
const ENVELOPE_KEYS: &[&str] = &["data", "event", "payload"];

/// Parse a raw text frame.
pub fn parse_text(text: &str) -> EzaResult<TelemetryMessage> {
    let value: Value = serde_json::from_str(text)?;
    parse_message(&value)
}

/// Parse a decoded JSON frame.
///
/// Snake-case and camel-case keys are both accepted. Anything that cannot
/// be read as a message is a [`EzaError::ParseFailure`].
pub fn parse_message(value: &Value) -> EzaResult<TelemetryMessage> {
    if !value.is_object() {
        return Err(EzaError::ParseFailure(format!(
            "telemetry message is not an object: {}",
            truncate(&value.to_string())
        )));
    }

    let message_type = text_field(value, TYPE_KEYS).map(|t| t.to_ascii_lowercase());
    match message_type.as_deref() {
        Some("heartbeat" | "ping" | "keepalive" | "keep_alive") => Ok(TelemetryMessage::Heartbeat),
        Some("pipeline_health" | "health") => Ok(TelemetryMessage::Health(parse_health(
            envelope_body(value),
        ))),
        _ => parse_event(envelope_body(value)).map(TelemetryMessage::Event),
    }
}

/// Inner object of a `{type, data: {...}}` envelope, or the value itself.
fn envelope_body(value: &Value) -> &Value {
    ENVELOPE_KEYS
        .iter()
        .find_map(|key| lookup(value, &[*key]).filter(|v| v.is_object()))
        .unwrap_or(value)
}

fn parse_health(value: &Value) -> PipelineHealth {
    PipelineHealth {
        status: text_field(value, &["status", "state", "health"])
            .map(|s| PipelineStatus::from_label(&s))
            .unwrap_or_default(),
        detail: text_field(value, &["detail", "message", "reason"]),
        reported_at: timestamp(value).unwrap_or_else(Utc::now),
    }
}

fn parse_event(value: &Value) -> EzaResult<TelemetryEvent> {
    let id = text_field(value, &["id", "event_id", "eventId"])
        .ok_or_else(|| EzaError::ParseFailure("telemetry event without id".to_string()))?;

    Ok(TelemetryEvent {
        id,
        // Informational only; arrival order positions the event.
        timestamp: timestamp(value).unwrap_or_else(Utc::now),
        risk_score: number_field(value, &["risk_score", "riskScore", "score"]),
        flags: flags(value),
        fail_safe_triggered: bool_field(
            value,
            &["fail_safe_triggered", "failSafeTriggered", "fail_safe"],
        ),
        latency_ms: number_field(value, &["latency_ms", "latencyMs", "latency"]),
        provider_id: text_field(value, &["provider_id", "providerId", "provider"]),
    })
}

fn number_field(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| lookup(value, &[*key]))
        .find_map(as_number)
}

fn bool_field(value: &Value, keys: &[&str]) -> bool {
    keys.iter()
        .filter_map(|key| lookup(value, &[*key]))
        .find_map(|v| match v {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_f64().map(|n| n != 0.0),
            _ => None,
        })
        .unwrap_or(false)
}

fn flags(value: &Value) -> Vec<TelemetryFlag> {
    let Some(items) = lookup(value, &["flags"]).and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(_) => Some(TelemetryFlag {
                flag_type: text_field(item, &["type", "name", "flag"])?,
                severity: text_field(item, &["severity", "level"])
                    .and_then(|s| Severity::from_label(&s))
                    .unwrap_or_default(),
            }),
            other => as_text(other).map(|flag_type| TelemetryFlag {
                flag_type,
                severity: Severity::default(),
            }),
        })
        .collect()
}

/// RFC 3339 strings, or epoch numbers in milliseconds (seconds when small).
fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = ["timestamp", "ts", "created_at", "createdAt", "reported_at"]
        .iter()
        .find_map(|key| lookup(value, &[*key]))?;
    match raw {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| as_number(raw).and_then(from_epoch)),
        Value::Number(_) => as_number(raw).and_then(from_epoch),
        _ => None,
    }
}

fn from_epoch(n: f64) -> Option<DateTime<Utc>> {
    let millis = if n.abs() < 1e11 { n * 1000.0 } else { n };
    Utc.timestamp_millis_opt(millis as i64).single()
}

fn truncate(text: &str) -> String {
    const LIMIT: usize = 80;
    match text.char_indices().nth(LIMIT) {
        Some((at, _)) => format!("{}...", &text[..at]),
        None => text.to_string(),
    }
}
