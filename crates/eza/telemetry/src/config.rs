//! Telemetry client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest buffer any surface may ask for.
pub const MIN_BUFFER_CAPACITY: usize = 20;
/// Largest buffer any surface may ask for.
pub const MAX_BUFFER_CAPACITY: usize = 200;

/// Configuration for a [`crate::TelemetryClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Event feed URL.
    #[serde(default = "default_stream_url")]
    pub stream_url: String,

    /// Fixed delay between reconnect attempts.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Recent-events buffer length, clamped to 20..=200.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Whether alert side effects fire at all.
    #[serde(default)]
    pub alerts_enabled: bool,

    /// Risk score above which an event raises an alert, on the feed's own
    /// scale.
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,

    /// Pending alerts held for the alert sink before new ones are dropped.
    #[serde(default = "default_alert_queue")]
    pub alert_queue: usize,
}

fn default_stream_url() -> String {
    "http://localhost:8000/api/telemetry/stream".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    3_000
}

fn default_buffer_capacity() -> usize {
    50
}

fn default_alert_threshold() -> f64 {
    0.8
}

fn default_alert_queue() -> usize {
    16
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            stream_url: default_stream_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            buffer_capacity: default_buffer_capacity(),
            alerts_enabled: false,
            alert_threshold: default_alert_threshold(),
            alert_queue: default_alert_queue(),
        }
    }
}

impl TelemetryConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Buffer capacity actually used.
    pub fn effective_capacity(&self) -> usize {
        self.buffer_capacity
            .clamp(MIN_BUFFER_CAPACITY, MAX_BUFFER_CAPACITY)
    }
}
