//! EZA Client - request orchestration and backend boundaries
//!
//! Everything that talks to the analysis backend lives here:
//!
//! - [`Orchestrator`]: submits content, wires the answer into a staged
//!   aggregator and publishes each refinement on a watch channel
//! - [`AnalysisTransport`] / [`HttpAnalysisTransport`]: single JSON bodies
//!   or NDJSON / SSE streams of partial payloads
//! - [`AuditTrail`]: append-only record of successful terminal results
//! - [`HistorySource`] / [`HistoryClient`]: historical search
//! - [`SessionStore`] / [`ChatSession`]: injectable chat state
//!
//! ## Failure semantics
//!
//! A network failure, backend-reported error or timeout ends the request
//! with a terminal result whose `breakdown["error"]` holds the message.
//! Requests are never retried automatically.

#![deny(unsafe_code)]

pub mod audit;
pub mod config;
pub mod framing;
pub mod history;
pub mod http;
pub mod orchestrator;
pub mod session;
pub mod transport;

pub use audit::{AuditRecord, AuditTrail, FileAuditTrail, MemoryAuditTrail};
pub use config::{EndpointPaths, OrchestratorConfig};
pub use framing::{json_frames, json_frames_with_limit, FrameDecoder, Framing, MAX_LINE_BYTES};
pub use history::{HistoryClient, HistoryQuery, HistorySource};
pub use http::HttpAnalysisTransport;
pub use orchestrator::{Orchestrator, Submission};
pub use session::{ChatMessage, ChatSession, MemorySessionStore, Role, SessionStore};
pub use transport::{
    transport_error, AnalysisRequest, AnalysisResponse, AnalysisTransport, PayloadStream,
};
