//! Runtime wiring
//!
//! Builds every component from one [`EzaConfig`] and hands out the pieces
//! presentation code talks to.

use crate::config::EzaConfig;
use eza_analytics::{aggregate_with, AggregateSnapshot};
use eza_client::{
    AnalysisTransport, AuditTrail, ChatSession, FileAuditTrail, HistoryClient, HistoryQuery,
    HistorySource, HttpAnalysisTransport, MemoryAuditTrail, MemorySessionStore, Orchestrator,
    Submission,
};
use eza_stage::StageRegistry;
use eza_telemetry::{AlertSink, SseTelemetrySource, TelemetryClient, TelemetryHandle};
use eza_types::{AnalysisMode, CanonicalResult, EzaResult};
use std::sync::Arc;
use tracing::{info, instrument};

pub struct EzaRuntime {
    config: EzaConfig,
    orchestrator: Orchestrator,
    history: Arc<dyn HistorySource>,
}

impl EzaRuntime {
    /// Build the HTTP-backed runtime. Opens the audit file when one is
    /// configured.
    pub async fn new(config: EzaConfig) -> EzaResult<Self> {
        config.validate()?;
        let base_url = &config.orchestrator.base_url;
        let transport = Arc::new(HttpAnalysisTransport::new(base_url)?);
        let history = Arc::new(HistoryClient::new(
            base_url,
            &config.orchestrator.history_path,
        )?);
        let audit: Arc<dyn AuditTrail> = match &config.audit_path {
            Some(path) => Arc::new(FileAuditTrail::open(path.clone()).await?),
            None => Arc::new(MemoryAuditTrail::new()),
        };

        info!(
            base_url = %base_url,
            persistent_audit = config.audit_path.is_some(),
            "EZA runtime ready"
        );
        Ok(Self::with_parts(config, transport, audit, history))
    }

    /// Assemble a runtime from explicit boundaries.
    pub fn with_parts(
        config: EzaConfig,
        transport: Arc<dyn AnalysisTransport>,
        audit: Arc<dyn AuditTrail>,
        history: Arc<dyn HistorySource>,
    ) -> Self {
        let orchestrator = Orchestrator::new(config.orchestrator.clone(), transport, audit);
        Self {
            config,
            orchestrator,
            history,
        }
    }

    pub fn config(&self) -> &EzaConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn submit(&self, content: impl Into<String>, mode: AnalysisMode) -> Submission {
        self.orchestrator.submit(content, mode)
    }

    /// A chat session with its own in-memory store.
    pub fn chat_session(&self, mode: AnalysisMode) -> ChatSession {
        ChatSession::new(
            Arc::new(MemorySessionStore::new(mode)),
            self.orchestrator.clone(),
        )
    }

    /// Router for partial payloads arriving outside the orchestrator,
    /// e.g. pushed over a shared channel.
    pub fn stage_registry(&self) -> StageRegistry {
        StageRegistry::with_options(self.config.stage.clone(), self.config.normalize.clone())
    }

    pub async fn history(&self, query: &HistoryQuery) -> EzaResult<Vec<CanonicalResult>> {
        self.history.fetch(query).await
    }

    /// Aggregate every successful result recorded in the audit trail.
    #[instrument(skip(self))]
    pub async fn dashboard_snapshot(&self) -> EzaResult<AggregateSnapshot> {
        let records = self.orchestrator.audit().records().await?;
        Ok(aggregate_with(
            records.iter().map(|record| &record.result),
            &self.config.aggregation,
        ))
    }

    /// Aggregate a historical query.
    #[instrument(skip(self))]
    pub async fn history_snapshot(&self, query: &HistoryQuery) -> EzaResult<AggregateSnapshot> {
        let records = self.history(query).await?;
        Ok(aggregate_with(&records, &self.config.aggregation))
    }

    /// Start the live feed from the configured stream URL. Must be called
    /// inside a tokio runtime.
    pub fn start_telemetry(
        &self,
        alert_sink: Option<Arc<dyn AlertSink>>,
    ) -> EzaResult<TelemetryHandle> {
        let telemetry = self.config.telemetry.clone();
        let source = Arc::new(SseTelemetrySource::new(telemetry.stream_url.clone())?);
        let client = TelemetryClient::new(telemetry, source);
        let client = match alert_sink {
            Some(sink) => client.with_alert_sink(sink),
            None => client,
        };
        Ok(client.start())
    }
}
