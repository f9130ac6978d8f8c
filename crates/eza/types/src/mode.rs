//! Analysis modes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend analysis variant selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Immediate score first, fuller payload later.
    #[default]
    Fast,
    /// Full multi-stage analysis with sub-analysis breakdown.
    Deep,
    /// Self-contained single-response analysis.
    Standalone,
    /// Analysis proxied through the platform gateway.
    Proxy,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 4] = [
        AnalysisMode::Fast,
        AnalysisMode::Deep,
        AnalysisMode::Standalone,
        AnalysisMode::Proxy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Fast => "fast",
            AnalysisMode::Deep => "deep",
            AnalysisMode::Standalone => "standalone",
            AnalysisMode::Proxy => "proxy",
        }
    }

    /// Parse a mode label, accepting a few legacy spellings.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "fast" | "quick" => Some(AnalysisMode::Fast),
            "deep" | "full" => Some(AnalysisMode::Deep),
            "standalone" => Some(AnalysisMode::Standalone),
            "proxy" | "proxy_fast" | "proxy-fast" => Some(AnalysisMode::Proxy),
            _ => None,
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
