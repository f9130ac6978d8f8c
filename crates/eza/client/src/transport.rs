//! Analysis transport abstraction

use async_trait::async_trait;
use eza_types::{AnalysisMode, EzaError, EzaResult, RequestId};
use futures_util::stream::BoxStream;
use serde::Serialize;
use serde_json::Value;

/// Stream of partial payloads for one request.
pub type PayloadStream = BoxStream<'static, EzaResult<Value>>;

/// One analysis submission as sent to the backend.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub request_id: RequestId,
    pub content: String,
    pub mode: AnalysisMode,
    /// Endpoint path chosen for `mode`.
    #[serde(skip)]
    pub endpoint: String,
    /// Sub-analyses requested from the backend.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub breakdown: Vec<String>,
}

/// What the backend answered with.
pub enum AnalysisResponse {
    /// A single terminal payload.
    Single(Value),
    /// An ordered sequence of partial payloads.
    Stream(PayloadStream),
}

impl std::fmt::Debug for AnalysisResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisResponse::Single(payload) => f.debug_tuple("Single").field(payload).finish(),
            AnalysisResponse::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Carries analysis requests to the backend.
///
/// Implementations only move bytes; scoring, normalization and staging
/// happen in the orchestrator.
#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    /// Send the request and return the backend's answer.
    async fn send(&self, request: &AnalysisRequest) -> EzaResult<AnalysisResponse>;
}

/// Map a reqwest error onto the shared taxonomy.
pub fn transport_error(err: reqwest::Error) -> EzaError {
    if err.is_decode() {
        EzaError::ParseFailure(err.to_string())
    } else {
        EzaError::TransportFailure(err.to_string())
    }
}
