//! Alert side effects
//!
//! Alerts never touch the event buffer or the reconnect logic, and raising
//! one never blocks message processing: alerts are queued on a bounded
//! channel drained by a dedicated task, and dropped with a warning when the
//! queue is full.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eza_types::TelemetryEvent;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Why an event raised an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum AlertReason {
    /// The backend reported a fail-safe trigger.
    FailSafe,
    /// Risk score above the configured threshold.
    RiskAboveThreshold { threshold: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub event_id: String,
    pub reason: AlertReason,
    pub risk_score: Option<f64>,
    pub raised_at: DateTime<Utc>,
}

/// Decides which events raise alerts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertPolicy {
    pub enabled: bool,
    pub threshold: f64,
}

impl AlertPolicy {
    /// At most one alert per event; fail-safe triggers take precedence.
    pub fn evaluate(&self, event: &TelemetryEvent) -> Option<Alert> {
        if !self.enabled {
            return None;
        }
        let reason = if event.fail_safe_triggered {
            AlertReason::FailSafe
        } else if event.risk_score.is_some_and(|score| score > self.threshold) {
            AlertReason::RiskAboveThreshold {
                threshold: self.threshold,
            }
        } else {
            return None;
        };
        Some(Alert {
            event_id: event.id.clone(),
            reason,
            risk_score: event.risk_score,
            raised_at: Utc::now(),
        })
    }
}

/// Receives alerts, e.g. to play an audible cue.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn alert(&self, alert: Alert);
}

/// Logs alerts at warn level.
#[derive(Debug, Default)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn alert(&self, alert: Alert) {
        warn!(
            event_id = %alert.event_id,
            reason = ?alert.reason,
            risk_score = ?alert.risk_score,
            "Telemetry alert"
        );
    }
}

/// Collects alerts in memory.
#[derive(Debug, Default)]
pub struct MemoryAlertSink {
    alerts: RwLock<Vec<Alert>>,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.read().clone()
    }

    pub fn count(&self) -> usize {
        self.alerts.read().len()
    }
}

#[async_trait]
impl AlertSink for MemoryAlertSink {
    async fn alert(&self, alert: Alert) {
        self.alerts.write().push(alert);
    }
}

/// Queues alerts for the dispatcher task without waiting.
#[derive(Debug, Clone)]
pub struct AlertRaiser {
    tx: mpsc::Sender<Alert>,
}

impl AlertRaiser {
    /// Queue an alert. Returns whether it was queued.
    pub fn raise(&self, alert: Alert) -> bool {
        match self.tx.try_send(alert) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(alert)) => {
                warn!(event_id = %alert.event_id, "Alert queue full, dropping alert");
                false
            }
            Err(mpsc::error::TrySendError::Closed(alert)) => {
                debug!(event_id = %alert.event_id, "Alert dispatcher closed");
                false
            }
        }
    }
}

/// Dedicated task draining queued alerts into an [`AlertSink`].
pub struct AlertDispatcher {
    raiser: AlertRaiser,
    worker: JoinHandle<()>,
}

impl AlertDispatcher {
    pub fn spawn(sink: Arc<dyn AlertSink>, queue: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Alert>(queue.max(1));
        let worker = tokio::spawn(async move {
            while let Some(alert) = rx.recv().await {
                sink.alert(alert).await;
            }
            debug!("Alert dispatcher stopped");
        });
        Self {
            raiser: AlertRaiser { tx },
            worker,
        }
    }

    pub fn raiser(&self) -> AlertRaiser {
        self.raiser.clone()
    }

    pub fn raise(&self, alert: Alert) -> bool {
        self.raiser.raise(alert)
    }

    /// Stop accepting alerts and let queued ones drain for up to `grace`.
    /// Drains only finish once every [`AlertRaiser`] clone is gone.
    pub async fn close(self, grace: Duration) {
        let Self { raiser, mut worker } = self;
        drop(raiser);
        if tokio::time::timeout(grace, &mut worker).await.is_err() {
            warn!("Alert sink did not drain in time, aborting");
            worker.abort();
        }
    }

    pub fn abort(&self) {
        self.worker.abort();
    }
}
