//! EZA Stage - staged result aggregation
//!
//! The analysis backend may answer progressively: an immediate score, then
//! a risk summary, then the full analysis. A [`StagedAggregator`] folds
//! these partial payloads into one [`eza_types::CanonicalResult`] that only
//! ever gets more complete.
//!
//! ## State machine
//!
//! ```text
//! AwaitingFirstStage -> HaveImmediateScore -> HaveRiskSummary -> Complete
//! ```
//!
//! - Transitions happen only on receipt of a payload and never go back.
//! - Payloads of an older stage are ignored.
//! - Once `Complete`, the working state is discarded and every later
//!   payload is ignored.
//!
//! [`StageRegistry`] routes payloads carrying an analysis id to their own
//! aggregator. Aggregators for different ids never interact.

#![deny(unsafe_code)]

pub mod aggregator;
pub mod config;
pub mod merge;
pub mod registry;
pub mod state;

pub use aggregator::StagedAggregator;
pub use config::StageConfig;
pub use registry::{RoutedUpdate, StageRegistry};
pub use state::{AggregatorState, IgnoreReason, StageOutcome};
