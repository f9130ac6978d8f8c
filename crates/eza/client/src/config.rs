//! Orchestrator configuration

use eza_types::AnalysisMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the request orchestrator and history client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Base URL of the analysis backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Endpoint path per analysis mode.
    #[serde(default)]
    pub endpoints: EndpointPaths,

    /// Longest silence tolerated while waiting for the next payload.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Path of the historical search endpoint.
    #[serde(default = "default_history_path")]
    pub history_path: String,

    /// Sub-analyses requested in deep mode.
    #[serde(default = "default_deep_breakdown")]
    pub deep_breakdown: Vec<String>,
}

/// Endpoint paths for each [`AnalysisMode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPaths {
    #[serde(default = "default_fast_path")]
    pub fast: String,
    #[serde(default = "default_deep_path")]
    pub deep: String,
    #[serde(default = "default_standalone_path")]
    pub standalone: String,
    #[serde(default = "default_proxy_path")]
    pub proxy: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_history_path() -> String {
    "/api/analyses/history".to_string()
}

fn default_deep_breakdown() -> Vec<String> {
    ["bias", "deception", "legal", "psychological_pressure"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_fast_path() -> String {
    "/api/analyze/fast".to_string()
}

fn default_deep_path() -> String {
    "/api/analyze/deep".to_string()
}

fn default_standalone_path() -> String {
    "/api/analyze/standalone".to_string()
}

fn default_proxy_path() -> String {
    "/api/proxy/analyze".to_string()
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            fast: default_fast_path(),
            deep: default_deep_path(),
            standalone: default_standalone_path(),
            proxy: default_proxy_path(),
        }
    }
}

impl EndpointPaths {
    pub fn for_mode(&self, mode: AnalysisMode) -> &str {
        match mode {
            AnalysisMode::Fast => &self.fast,
            AnalysisMode::Deep => &self.deep,
            AnalysisMode::Standalone => &self.standalone,
            AnalysisMode::Proxy => &self.proxy,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            endpoints: EndpointPaths::default(),
            request_timeout_ms: default_request_timeout_ms(),
            history_path: default_history_path(),
            deep_breakdown: default_deep_breakdown(),
        }
    }
}

impl OrchestratorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Sub-analyses the backend is asked for in `mode`.
    pub fn breakdown_for(&self, mode: AnalysisMode) -> Vec<String> {
        match mode {
            AnalysisMode::Deep => self.deep_breakdown.clone(),
            _ => Vec::new(),
        }
    }
}
