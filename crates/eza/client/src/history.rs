//! Historical analysis search

use crate::transport::transport_error;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use eza_normalize::normalize;
use eza_types::{CanonicalResult, EzaError, EzaResult, RiskLevel};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// Filters for a historical search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub risk_level: Option<RiskLevel>,
    pub flag: Option<String>,
    pub limit: Option<u32>,
}

impl HistoryQuery {
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }

    pub fn with_risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = Some(risk_level);
        self
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flag = Some(flag.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string parameters, in a stable order.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(from) = self.from {
            params.push(("from", from.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(to) = self.to {
            params.push(("to", to.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(risk_level) = self.risk_level {
            params.push(("risk_level", risk_level.as_str().to_string()));
        }
        if let Some(flag) = &self.flag {
            params.push(("flag", flag.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

/// Source of historical analysis records.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Records matching `query`, normalized.
    async fn fetch(&self, query: &HistoryQuery) -> EzaResult<Vec<CanonicalResult>>;
}

/// Fetches historical records from the analysis backend over HTTP.
///
/// Records come back in the same heterogeneous shapes as live analyses and
/// are normalized one by one.
#[derive(Debug, Clone)]
pub struct HistoryClient {
    client: Client,
    url: String,
}

impl HistoryClient {
    pub fn new(base_url: &str, history_path: &str) -> EzaResult<Self> {
        let client = Client::builder().build().map_err(transport_error)?;
        Ok(Self::with_client(client, base_url, history_path))
    }

    pub fn with_client(client: Client, base_url: &str, history_path: &str) -> Self {
        Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), history_path),
        }
    }
}

#[async_trait]
impl HistorySource for HistoryClient {
    #[instrument(skip(self))]
    async fn fetch(&self, query: &HistoryQuery) -> EzaResult<Vec<CanonicalResult>> {
        let response = self
            .client
            .get(&self.url)
            .query(&query.to_params())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EzaError::BackendError(format!(
                "{} {}",
                status.as_u16(),
                message.trim()
            )));
        }

        let body: Value = response.json().await.map_err(transport_error)?;
        let records: Vec<CanonicalResult> = record_list(&body).iter().map(normalize).collect();
        debug!(count = records.len(), "Fetched historical records");
        Ok(records)
    }
}

/// The record array inside a history response: a bare array, or an object
/// wrapping it under one of a few known keys.
fn record_list(body: &Value) -> &[Value] {
    const WRAPPER_KEYS: &[&str] = &["records", "items", "results", "analyses", "data"];

    if let Some(items) = body.as_array() {
        return items;
    }
    WRAPPER_KEYS
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
