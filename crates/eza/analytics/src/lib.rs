//! EZA Analytics - dashboard aggregation
//!
//! Pure functions over batches of [`CanonicalResult`](eza_types::CanonicalResult)
//! and [`TelemetryEvent`](eza_types::TelemetryEvent). No network access and
//! no state between calls: a dashboard recomputes its snapshot from the full
//! batch every time, so counts never depend on the order records arrived in.
//!
//! ```
//! use eza_analytics::aggregate;
//! use eza_types::{CanonicalResult, Completeness};
//!
//! let mut scored = CanonicalResult::empty(Completeness::Complete);
//! scored.overall_score = Some(85.0);
//! let unscored = CanonicalResult::empty(Completeness::Complete);
//!
//! let snapshot = aggregate(&[scored, unscored]);
//! assert_eq!(snapshot.bands.low, 1);
//! assert_eq!(snapshot.bands.medium, 1); // assumed score of 50
//! ```

#![deny(unsafe_code)]

pub mod aggregate;
pub mod config;
pub mod events;
pub mod filter;
pub mod frequency;

pub use aggregate::{aggregate, aggregate_with, AggregateSnapshot, BandCounts, RiskLevelCounts};
pub use config::{AggregationConfig, RiskBand};
pub use events::{summarize_events, SeverityCounts, TelemetrySummary};
pub use filter::{filter_records, RecordFilter};
pub use frequency::{FrequencyEntry, FrequencyTable};
