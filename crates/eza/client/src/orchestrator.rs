//! Request orchestrator
//!
//! Chooses the endpoint for an analysis mode, wires the backend's answer
//! into a fresh [`StagedAggregator`] and publishes every refinement to the
//! submitter. This is the one place transport failures surface: they end
//! the request with a terminal error result. Nothing is retried here,
//! since resubmission may cost the backend; retrying is the caller's call.

use crate::audit::AuditTrail;
use crate::config::OrchestratorConfig;
use crate::transport::{AnalysisRequest, AnalysisResponse, AnalysisTransport};
use eza_normalize::{backend_error, NormalizeOptions};
use eza_stage::StagedAggregator;
use eza_types::{AnalysisMode, CanonicalResult, Completeness, EzaError, EzaResult, RequestId};
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Handle on one submitted analysis.
///
/// Dropping it does not cancel the in-flight call: the request still runs
/// to completion and successful results are still audited.
#[derive(Debug)]
pub struct Submission {
    pub request_id: RequestId,
    pub mode: AnalysisMode,
    /// Latest known result; every refinement is published here.
    pub updates: watch::Receiver<CanonicalResult>,
}

impl Submission {
    /// Latest known result.
    pub fn latest(&self) -> CanonicalResult {
        self.updates.borrow().clone()
    }

    /// Wait for the terminal result.
    pub async fn completed(mut self) -> CanonicalResult {
        loop {
            {
                let current = self.updates.borrow_and_update();
                if current.is_complete() {
                    return current.clone();
                }
            }
            if self.updates.changed().await.is_err() {
                let last = self.updates.borrow().clone();
                if last.is_complete() {
                    return last;
                }
                return CanonicalResult::failed("analysis task ended without a result");
            }
        }
    }
}

/// Issues analysis requests and drives their staged aggregation.
#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<OrchestratorConfig>,
    transport: Arc<dyn AnalysisTransport>,
    audit: Arc<dyn AuditTrail>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        transport: Arc<dyn AnalysisTransport>,
        audit: Arc<dyn AuditTrail>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            audit,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn audit(&self) -> &Arc<dyn AuditTrail> {
        &self.audit
    }

    /// Submit content for analysis.
    ///
    /// Must be called from within a tokio runtime; the request runs on its
    /// own task.
    pub fn submit(&self, content: impl Into<String>, mode: AnalysisMode) -> Submission {
        let request = AnalysisRequest {
            request_id: RequestId::generate(),
            content: content.into(),
            mode,
            endpoint: self.config.endpoints.for_mode(mode).to_string(),
            breakdown: self.config.breakdown_for(mode),
        };
        let (tx, rx) = watch::channel(CanonicalResult::empty(Completeness::Partial));

        info!(
            request_id = %request.request_id,
            mode = %mode,
            endpoint = %request.endpoint,
            "Submitting analysis"
        );

        let submission = Submission {
            request_id: request.request_id.clone(),
            mode,
            updates: rx,
        };
        tokio::spawn(run_request(
            self.transport.clone(),
            self.audit.clone(),
            request,
            self.config.request_timeout(),
            tx,
        ));
        submission
    }
}

#[instrument(skip_all, fields(request_id = %request.request_id, mode = %request.mode))]
async fn run_request(
    transport: Arc<dyn AnalysisTransport>,
    audit: Arc<dyn AuditTrail>,
    request: AnalysisRequest,
    timeout: Duration,
    tx: watch::Sender<CanonicalResult>,
) {
    let options = NormalizeOptions::with_breakdown(request.breakdown.clone());
    let mut aggregator = StagedAggregator::with_options(request.request_id.as_str(), options);

    let result = match collect(transport.as_ref(), &request, timeout, &mut aggregator, &tx).await {
        Ok(()) => aggregator.into_result(),
        Err(err) => {
            warn!(error = %err, "Analysis request failed");
            CanonicalResult::failed(err.to_string())
        }
    };

    if !result.is_failure() {
        if let Err(err) = audit
            .append(request.request_id.clone(), request.mode, result.clone())
            .await
        {
            warn!(error = %err, "Failed to append result to audit trail");
        }
    }

    debug!(score = ?result.overall_score, risk_level = %result.risk_level, "Analysis finished");
    tx.send_replace(result);
}

async fn collect(
    transport: &dyn AnalysisTransport,
    request: &AnalysisRequest,
    timeout: Duration,
    aggregator: &mut StagedAggregator,
    tx: &watch::Sender<CanonicalResult>,
) -> EzaResult<()> {
    let timed_out = || EzaError::Timeout(timeout.as_millis() as u64);

    let response = tokio::time::timeout(timeout, transport.send(request))
        .await
        .map_err(|_| timed_out())??;

    let mut stream = match response {
        AnalysisResponse::Single(payload) => {
            reject_backend_error(&payload)?;
            aggregator.apply_terminal(&payload);
            return Ok(());
        }
        AnalysisResponse::Stream(stream) => stream,
    };

    let mut received = 0usize;
    while !aggregator.is_complete() {
        let next = tokio::time::timeout(timeout, stream.next())
            .await
            .map_err(|_| timed_out())?;
        let payload = match next {
            None => break,
            Some(Ok(payload)) => payload,
            Some(Err(EzaError::ParseFailure(reason))) => {
                warn!(%reason, "Dropping unparseable partial payload");
                continue;
            }
            Some(Err(err)) => return Err(err),
        };

        reject_backend_error(&payload)?;
        received += 1;
        let outcome = aggregator.apply(&payload);
        debug!(?outcome, state = %aggregator.state(), "Partial payload applied");
        if outcome.changed() && !aggregator.is_complete() {
            tx.send_replace(aggregator.snapshot().clone());
        }
    }

    if received == 0 {
        return Err(EzaError::TransportFailure(
            "stream ended before any analysis payload arrived".to_string(),
        ));
    }
    aggregator.finish();
    Ok(())
}

fn reject_backend_error(payload: &serde_json::Value) -> EzaResult<()> {
    match backend_error(payload) {
        Some(message) => Err(EzaError::BackendError(message)),
        None => Ok(()),
    }
}
