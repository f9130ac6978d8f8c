//! Telemetry event types
//!
//! Events are created on stream receipt, appended to the telemetry
//! client's bounded buffer and never mutated afterwards.

use crate::result::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A flag attached to a telemetry sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryFlag {
    #[serde(rename = "type")]
    pub flag_type: String,
    pub severity: Severity,
}

/// One operational sample from the event feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub id: String,
    /// Timestamp reported by the feed. Informational only: buffer position
    /// follows arrival order.
    pub timestamp: DateTime<Utc>,
    pub risk_score: Option<f64>,
    pub flags: Vec<TelemetryFlag>,
    pub fail_safe_triggered: bool,
    pub latency_ms: Option<f64>,
    pub provider_id: Option<String>,
}

impl TelemetryEvent {
    /// Highest flag severity on this event, if it has flags.
    pub fn max_flag_severity(&self) -> Option<Severity> {
        self.flags.iter().map(|f| f.severity).max()
    }
}

/// Pipeline health as reported by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Healthy,
    Degraded,
    Down,
    #[default]
    Unknown,
}

impl PipelineStatus {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "healthy" | "ok" | "up" | "green" => PipelineStatus::Healthy,
            "degraded" | "warning" | "yellow" => PipelineStatus::Degraded,
            "down" | "failed" | "error" | "red" => PipelineStatus::Down,
            _ => PipelineStatus::Unknown,
        }
    }
}

/// Latest pipeline health snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineHealth {
    pub status: PipelineStatus,
    pub detail: Option<String>,
    pub reported_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_flag_severity() {
        let event = TelemetryEvent {
            id: "e1".into(),
            timestamp: Utc::now(),
            risk_score: Some(0.4),
            flags: vec![
                TelemetryFlag {
                    flag_type: "pii".into(),
                    severity: Severity::Medium,
                },
                TelemetryFlag {
                    flag_type: "jailbreak".into(),
                    severity: Severity::High,
                },
            ],
            fail_safe_triggered: false,
            latency_ms: Some(120.0),
            provider_id: None,
        };
        assert_eq!(event.max_flag_severity(), Some(Severity::High));
    }

    #[test]
    fn test_pipeline_status_labels() {
        assert_eq!(PipelineStatus::from_label("OK"), PipelineStatus::Healthy);
        assert_eq!(PipelineStatus::from_label("degraded"), PipelineStatus::Degraded);
        assert_eq!(PipelineStatus::from_label("???"), PipelineStatus::Unknown);
    }
}
