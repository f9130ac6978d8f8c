//! Telemetry feed summaries for monitoring widgets

use eza_types::{Severity, TelemetryEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl SeverityCounts {
    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Low => self.low += 1,
            Severity::Medium => self.medium += 1,
            Severity::High => self.high += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySummary {
    pub count: usize,
    pub fail_safe_count: usize,
    /// Mean over events that report latency.
    pub average_latency_ms: Option<f64>,
    pub max_latency_ms: Option<f64>,
    /// Mean over events that report a risk score.
    pub average_risk_score: Option<f64>,
    /// Events per provider; events without one are not counted here.
    pub providers: BTreeMap<String, usize>,
    /// Flags per severity across all events.
    pub flag_severities: SeverityCounts,
    latency_samples: usize,
    risk_samples: usize,
}

impl TelemetrySummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the summary.
    pub fn record(&mut self, event: &TelemetryEvent) {
        self.count += 1;
        if event.fail_safe_triggered {
            self.fail_safe_count += 1;
        }

        if let Some(latency) = event.latency_ms.filter(|l| l.is_finite() && *l >= 0.0) {
            self.latency_samples += 1;
            self.max_latency_ms = Some(self.max_latency_ms.map_or(latency, |max| max.max(latency)));
            let mean = self.average_latency_ms.unwrap_or(0.0);
            self.average_latency_ms =
                Some(mean + (latency - mean) / self.latency_samples as f64);
        }

        if let Some(score) = event.risk_score.filter(|s| s.is_finite()) {
            self.risk_samples += 1;
            let mean = self.average_risk_score.unwrap_or(0.0);
            self.average_risk_score = Some(mean + (score - mean) / self.risk_samples as f64);
        }

        if let Some(provider) = &event.provider_id {
            *self.providers.entry(provider.clone()).or_default() += 1;
        }
        for flag in &event.flags {
            self.flag_severities.add(flag.severity);
        }
    }

    /// Share of events that triggered the fail-safe.
    pub fn fail_safe_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.fail_safe_count as f64 / self.count as f64
        }
    }
}

pub fn summarize_events<'a, I>(events: I) -> TelemetrySummary
where
    I: IntoIterator<Item = &'a TelemetryEvent>,
{
    let mut summary = TelemetrySummary::new();
    for event in events {
        summary.record(event);
    }
    summary
}
