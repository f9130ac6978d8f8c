//! EZA Types - canonical model for progressive analysis ingestion
//!
//! Every display surface (chat analysis panels, regulator and platform
//! dashboards, telemetry widgets) consumes the types in this crate and
//! nothing else. The upstream analysis backend answers in many historical
//! shapes; those shapes are quarantined in `eza-normalize` and never leak
//! past it.
//!
//! ## Key Concepts
//!
//! - **CanonicalResult**: the one normalized analysis outcome
//! - **Completeness**: `partial` results may still change, `complete` ones never do
//! - **TelemetryEvent**: one operational sample from the live event feed
//! - **EzaError**: the shared error taxonomy (malformed, transport, stale, parse)

#![deny(unsafe_code)]

pub mod error;
pub mod ids;
pub mod mode;
pub mod result;
pub mod telemetry;

pub use error::{EzaError, EzaResult};
pub use ids::RequestId;
pub use mode::AnalysisMode;
pub use result::{
    CanonicalResult, Completeness, Intent, RiskLevel, RiskLocation, Severity, ERROR_KEY,
};
pub use telemetry::{PipelineHealth, PipelineStatus, TelemetryEvent, TelemetryFlag};
