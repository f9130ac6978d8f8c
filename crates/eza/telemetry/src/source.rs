//! Event feed sources

use async_trait::async_trait;
use eza_client::{json_frames, transport_error, Framing};
use eza_types::{EzaError, EzaResult};
use futures_util::stream::BoxStream;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Decoded JSON frames of one open connection.
pub type FrameStream = BoxStream<'static, EzaResult<Value>>;

/// Opens connections to the event feed.
///
/// The stream ends when the server closes the connection; a transport
/// error is yielded once before the end. Unparseable frames are yielded as
/// [`EzaError::ParseFailure`] and do not end the stream.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn connect(&self) -> EzaResult<FrameStream>;
}

/// Server-sent events over HTTP.
#[derive(Debug, Clone)]
pub struct SseTelemetrySource {
    client: Client,
    url: String,
}

impl SseTelemetrySource {
    pub fn new(url: impl Into<String>) -> EzaResult<Self> {
        let client = Client::builder().build().map_err(transport_error)?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl TelemetrySource for SseTelemetrySource {
    async fn connect(&self) -> EzaResult<FrameStream> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(EzaError::TransportFailure(format!(
                "event feed answered {}",
                status.as_u16()
            )));
        }

        // Some gateways stream NDJSON on the same endpoint.
        let framing = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(Framing::from_content_type)
            .unwrap_or(Framing::Sse);
        debug!(url = %self.url, ?framing, "Event feed connected");

        Ok(json_frames(response.bytes_stream(), framing))
    }
}
