//! EZA Telemetry - live event feed for monitoring dashboards
//!
//! Connects to the server-sent event feed, keeps a bounded newest-first
//! buffer of risk events, tracks pipeline health and optionally raises
//! alerts on fail-safe triggers or high risk.
//!
//! ## Connection lifecycle
//!
//! ```text
//! Disconnected --connect--> Connecting --opened--> Connected
//!      ^                        |                      |
//!      +----- connect_failed ---+------- lost ---------+
//! ```
//!
//! After every failure or loss the client waits a fixed delay (3 s by
//! default) before connecting again. There is no backoff. Teardown is
//! valid from any state and cancels a pending reconnect.
//!
//! ## Example
//!
//! ```no_run
//! use eza_telemetry::{LogAlertSink, SseTelemetrySource, TelemetryClient, TelemetryConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> eza_types::EzaResult<()> {
//! let config = TelemetryConfig::default();
//! let source = Arc::new(SseTelemetrySource::new(config.stream_url.clone())?);
//! let handle = TelemetryClient::new(config, source)
//!     .with_alert_sink(Arc::new(LogAlertSink))
//!     .start();
//!
//! for event in handle.events() {
//!     println!("{} {:?}", event.id, event.risk_score);
//! }
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod alert;
pub mod buffer;
pub mod client;
pub mod config;
pub mod message;
pub mod source;
pub mod state;

pub use alert::{
    Alert, AlertDispatcher, AlertPolicy, AlertRaiser, AlertReason, AlertSink, LogAlertSink,
    MemoryAlertSink,
};
pub use buffer::EventBuffer;
pub use client::{TelemetryClient, TelemetryHandle};
pub use config::{TelemetryConfig, MAX_BUFFER_CAPACITY, MIN_BUFFER_CAPACITY};
pub use message::{parse_message, parse_text, TelemetryMessage};
pub use source::{FrameStream, SseTelemetrySource, TelemetrySource};
pub use state::{ConnectionEvent, ConnectionState, ConnectionStateMachine, TransitionError};
