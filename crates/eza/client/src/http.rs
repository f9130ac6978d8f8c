//! HTTP transport for the analysis backend

use crate::framing::{json_frames, Framing};
use crate::transport::{transport_error, AnalysisRequest, AnalysisResponse, AnalysisTransport};
use async_trait::async_trait;
use eza_types::{EzaError, EzaResult};
use reqwest::{header::CONTENT_TYPE, Client};
use serde_json::Value;
use tracing::{debug, instrument};

/// Posts analysis requests over HTTP.
///
/// A JSON body is treated as a single terminal answer. NDJSON and
/// server-sent event bodies are streamed as partial payloads.
#[derive(Debug, Clone)]
pub struct HttpAnalysisTransport {
    client: Client,
    base_url: String,
}

impl HttpAnalysisTransport {
    pub fn new(base_url: &str) -> EzaResult<Self> {
        let client = Client::builder().build().map_err(transport_error)?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AnalysisTransport for HttpAnalysisTransport {
    #[instrument(skip(self, request), fields(request_id = %request.request_id, mode = %request.mode))]
    async fn send(&self, request: &AnalysisRequest) -> EzaResult<AnalysisResponse> {
        let url = format!("{}{}", self.base_url, request.endpoint);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|payload| eza_normalize::backend_error(&payload))
                .unwrap_or(body);
            return Err(EzaError::BackendError(format!(
                "{} {}",
                status.as_u16(),
                message.trim()
            )));
        }

        let framing = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(Framing::from_content_type);

        match framing {
            Some(framing) => {
                debug!(?framing, "Streaming analysis response");
                Ok(AnalysisResponse::Stream(json_frames(
                    response.bytes_stream(),
                    framing,
                )))
            }
            None => {
                let payload = response.json::<Value>().await.map_err(transport_error)?;
                Ok(AnalysisResponse::Single(payload))
            }
        }
    }
}
