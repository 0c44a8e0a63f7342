use crate::error::{AIError, OpenAIError};
use async_stream::stream;
use bytes::Bytes;
use futures_core::stream::Stream;
use futures_util::StreamExt;
use serde_json::Value;
use std::pin::Pin;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, trace, warn};

/// Raw byte chunks as delivered by the HTTP body.
pub type RawByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, AIError>> + Send>>;

/// What one SSE `data:` payload means for the text stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// A text delta to surface.
    Delta(String),
    /// `[DONE]` terminator.
    Done,
    /// Provider error object embedded in the stream.
    Error(String),
    /// Role headers, empty deltas, keep-alives.
    Ignored,
}

/// Interpret one SSE `data:` payload of an OpenAI chat-completion stream.
pub fn parse_sse_payload(payload: &str) -> SseEvent {
    let payload = payload.trim();
    if payload == "[DONE]" {
        return SseEvent::Done;
    }
    let Ok(v) = serde_json::from_str::<Value>(payload) else {
        debug!(target: "tutorbot::stream", "skipping non-JSON SSE payload");
        return SseEvent::Ignored;
    };
    if let Some(err) = v.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return SseEvent::Error(message);
    }
    match v
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c0| c0.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
    {
        Some(token) if !token.is_empty() => SseEvent::Delta(token.to_string()),
        _ => SseEvent::Ignored,
    }
}

/// Turn an SSE byte stream into text deltas.
///
/// Ends at `[DONE]` or end of body. A transport failure or an error event is yielded
/// once as `Err` and ends the stream.
pub fn text_deltas_from_sse(byte_stream: RawByteStream) -> impl Stream<Item = Result<String, AIError>> {
    stream! {
        use tokio_util::io::StreamReader;

        let io_stream = byte_stream.map(|res| match res {
            Ok(bytes) => Ok::<Bytes, std::io::Error>(bytes),
            Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())),
        });
        let reader = StreamReader::new(io_stream);

        let mut lines = BufReader::new(reader).lines();
        let mut event_data = String::new();
        let mut deltas = 0usize;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(target: "tutorbot::stream", error = %e, "stream interrupted");
                    yield Err(AIError::Stream(e.to_string()));
                    return;
                }
            };

            if !line.is_empty() {
                // Multi-line data fields join with a newline
                if let Some(data) = line.strip_prefix("data:") {
                    if !event_data.is_empty() { event_data.push('\n'); }
                    event_data.push_str(data.strip_prefix(' ').unwrap_or(data));
                }
                continue;
            }
            if event_data.is_empty() {
                continue;
            }

            let event = parse_sse_payload(&event_data);
            event_data.clear();
            match event {
                SseEvent::Delta(token) => {
                    deltas += 1;
                    trace!(target: "tutorbot::stream", len = token.len(), "delta");
                    yield Ok(token);
                }
                SseEvent::Done => {
                    debug!(target: "tutorbot::stream", deltas, "stream done");
                    return;
                }
                SseEvent::Error(message) => {
                    warn!(target: "tutorbot::stream", %message, "provider error in stream");
                    yield Err(AIError::OpenAI(OpenAIError::Api(message)));
                    return;
                }
                SseEvent::Ignored => {}
            }
        }

        // Body ended without a trailing blank line
        if !event_data.is_empty() {
            match parse_sse_payload(&event_data) {
                SseEvent::Delta(token) => yield Ok(token),
                SseEvent::Error(message) => yield Err(AIError::OpenAI(OpenAIError::Api(message))),
                SseEvent::Done | SseEvent::Ignored => {}
            }
        }
        debug!(target: "tutorbot::stream", deltas, "stream ended");
    }
}
