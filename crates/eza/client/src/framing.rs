//! Line framing for streamed JSON bodies
//!
//! Progressive analyses and the telemetry feed both arrive as a byte stream
//! of JSON documents: either NDJSON or server-sent events whose `data:`
//! lines carry one document per event.

use bytes::Bytes;
use eza_types::{EzaError, EzaResult};
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value;

/// How JSON documents are delimited in a streamed body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// One JSON document per line.
    Ndjson,
    /// Server-sent events; one JSON document per event.
    Sse,
}

impl Framing {
    /// Framing implied by a response content type. `None` means a single
    /// JSON body.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "text/event-stream" => Some(Framing::Sse),
            "application/x-ndjson" | "application/ndjson" | "application/jsonl"
            | "application/x-jsonlines" => Some(Framing::Ndjson),
            _ => None,
        }
    }
}

/// Longest line accepted before the rest of it is discarded.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Turns complete lines into JSON documents.
///
/// NDJSON yields one document per line. Server-sent events collect `data:`
/// lines until a blank line ends the event, join them with `\n` and parse
/// the result once. Comments and other SSE fields are skipped.
#[derive(Debug)]
pub struct FrameDecoder {
    framing: Framing,
    data: Vec<String>,
}

impl FrameDecoder {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            data: Vec::new(),
        }
    }

    /// Feed one line, without its terminator. Returns a document once one
    /// is complete.
    pub fn push_line(&mut self, line: &str) -> Option<EzaResult<Value>> {
        match self.framing {
            Framing::Ndjson => parse_document(line),
            Framing::Sse => {
                if line.trim().is_empty() {
                    return self.dispatch();
                }
                if line.starts_with(':') {
                    return None;
                }
                let (field, value) = match line.split_once(':') {
                    Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                    None => (line, ""),
                };
                if field == "data" {
                    self.data.push(value.to_string());
                }
                None
            }
        }
    }

    /// Flush an event left open when the stream ended cleanly.
    pub fn finish(&mut self) -> Option<EzaResult<Value>> {
        self.dispatch()
    }

    /// Drop a partially received event.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    fn dispatch(&mut self) -> Option<EzaResult<Value>> {
        if self.data.is_empty() {
            return None;
        }
        let body = self.data.join("\n");
        self.data.clear();
        parse_document(&body)
    }
}

/// `None` for bodies that carry no document (blank, `[DONE]` markers).
fn parse_document(body: &str) -> Option<EzaResult<Value>> {
    let body = body.trim();
    if body.is_empty() || body == "[DONE]" {
        return None;
    }
    Some(serde_json::from_str(body).map_err(EzaError::from))
}

/// Accumulates bytes and yields complete lines.
///
/// A line growing past the limit is cut off: [`LineBuffer::extend`] reports
/// a [`EzaError::ParseFailure`] and the remainder of that line is skipped
/// up to the next newline.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    limit: usize,
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            limit,
            discarding: false,
        }
    }

    pub fn extend(&mut self, chunk: &[u8]) -> EzaResult<()> {
        let mut chunk = chunk;
        if self.discarding {
            match chunk.iter().position(|b| *b == b'\n') {
                Some(end) => {
                    self.discarding = false;
                    chunk = &chunk[end + 1..];
                }
                None => return Ok(()),
            }
        }
        self.pending.extend_from_slice(chunk);

        let open_tail = match self.pending.iter().rposition(|b| *b == b'\n') {
            Some(end) => self.pending.len() - end - 1,
            None => self.pending.len(),
        };
        if open_tail > self.limit {
            let keep = self.pending.len() - open_tail;
            self.pending.truncate(keep);
            self.discarding = true;
            return Err(EzaError::ParseFailure(format!(
                "line exceeds {} bytes",
                self.limit
            )));
        }
        Ok(())
    }

    /// Next complete line, without its terminator.
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(
            String::from_utf8_lossy(&line)
                .trim_end_matches(['\n', '\r'])
                .to_string(),
        )
    }

    /// Whatever is left once the stream ended.
    pub fn take_rest(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(
            String::from_utf8_lossy(&rest)
                .trim_end_matches('\r')
                .to_string(),
        )
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }
}

struct FrameState<E> {
    bytes: BoxStream<'static, Result<Bytes, E>>,
    buffer: LineBuffer,
    decoder: FrameDecoder,
    overflow: Option<EzaError>,
    ended: bool,
}

/// Turn a byte stream into a stream of JSON documents.
///
/// A transport error is yielded once and ends the stream. Documents that
/// fail to parse, and lines longer than [`MAX_LINE_BYTES`], are yielded as
/// [`EzaError::ParseFailure`] and the stream goes on.
pub fn json_frames<S, E>(bytes: S, framing: Framing) -> BoxStream<'static, EzaResult<Value>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    json_frames_with_limit(bytes, framing, MAX_LINE_BYTES)
}

/// [`json_frames`] with an explicit line length limit.
pub fn json_frames_with_limit<S, E>(
    bytes: S,
    framing: Framing,
    line_limit: usize,
) -> BoxStream<'static, EzaResult<Value>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = FrameState {
        bytes: bytes.boxed(),
        buffer: LineBuffer::with_limit(line_limit),
        decoder: FrameDecoder::new(framing),
        overflow: None,
        ended: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.buffer.next_line() {
                match state.decoder.push_line(&line) {
                    Some(frame) => return Some((frame, state)),
                    None => continue,
                }
            }
            // Complete lines ahead of an oversized one go out first.
            if let Some(err) = state.overflow.take() {
                return Some((Err(err), state));
            }
            if state.ended {
                if let Some(rest) = state.buffer.take_rest() {
                    if let Some(frame) = state.decoder.push_line(&rest) {
                        return Some((frame, state));
                    }
                }
                return state.decoder.finish().map(|frame| (frame, state));
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    if let Err(err) = state.buffer.extend(&chunk) {
                        state.overflow = Some(err);
                    }
                }
                Some(Err(err)) => {
                    state.ended = true;
                    state.buffer.clear();
                    state.decoder.reset();
                    return Some((Err(EzaError::TransportFailure(err.to_string())), state));
                }
                None => state.ended = true,
            }
        }
    })
    .boxed()
}
