use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt, stream};
use std::fmt::Display;
use tracing::warn;

use crate::error::{Result, RouterError};
use crate::models::openai::{ChatCompletionChunk, ChunkStream};

const DONE_MARKER: &str = "[DONE]";

/// Stateful parser for an upstream `text/event-stream` body
///
/// Bytes may arrive split anywhere, including mid-line and mid-UTF-8 sequence,
/// so input is buffered until a full line is available.
pub struct SseChunkParser {
    buffer: BytesMut,
    done: bool,
}

impl SseChunkParser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            done: false,
        }
    }

    /// Feed new data and extract every complete `data:` payload as a chunk.
    ///
    /// A payload carrying an `error` object becomes an `UpstreamError` item.
    /// Payloads that are not valid chunks are logged and skipped.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Result<ChatCompletionChunk>> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(data);

        let mut results = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(line_end);
            self.buffer.advance(1);

            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches('\r');
            let Some(payload) = line.strip_prefix("data:") else {
                // Comments, `event:`, `id:` and blank separators
                continue;
            };

            let payload = payload.trim();
            if payload.is_empty() {
                continue;
            }
            if payload == DONE_MARKER {
                self.done = true;
                self.buffer.clear();
                break;
            }

            if let Some(item) = Self::parse_payload(payload) {
                results.push(item);
            }
        }

        results
    }

    fn parse_payload(payload: &str) -> Option<Result<ChatCompletionChunk>> {
        match serde_json::from_str::<ChatCompletionChunk>(payload) {
            Ok(mut chunk) => {
                if let Some(error) = chunk.extra.remove("error") {
                    let message = error
                        .get("message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| error.to_string());
                    return Some(Err(RouterError::UpstreamError(message)));
                }
                Some(Ok(chunk))
            }
            Err(e) => {
                warn!(error = %e, payload, "Failed to parse upstream chunk");
                None
            }
        }
    }

    /// Flush a final line the upstream left unterminated when the body ended
    pub fn finish(&mut self) -> Vec<Result<ChatCompletionChunk>> {
        if self.done || self.buffer.is_empty() {
            return Vec::new();
        }
        let results = self.feed(b"\n");
        self.done = true;
        self.buffer.clear();
        results
    }

    /// Whether the `[DONE]` marker has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// Turn a raw upstream body into a stream of completion chunks.
///
/// Transport errors become `UpstreamError` items; whatever is still buffered
/// when the body ends is flushed through [`SseChunkParser::finish`].
pub fn chunk_stream<S, E>(body: S) -> ChunkStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    stream::unfold(
        (body.boxed(), SseChunkParser::new(), false),
        |(mut body, mut parser, ended)| async move {
            if ended {
                return None;
            }
            let items = match body.next().await {
                Some(Ok(bytes)) => parser.feed(&bytes),
                Some(Err(e)) => vec![Err(RouterError::UpstreamError(format!(
                    "Upstream stream interrupted: {}",
                    e
                )))],
                None => return Some((parser.finish(), (body, parser, true))),
            };
            Some((items, (body, parser, false)))
        },
    )
    .flat_map(stream::iter)
    .boxed()
}

impl Default for SseChunkParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete_lines() {
        let mut parser = SseChunkParser::new();
        let data = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n";

        let chunks = parser.feed(data);
        assert_eq!(chunks.len(), 2);
        let first = chunks[0].as_ref().unwrap();
        assert_eq!(first.choices[0].delta.content.as_deref(), Some("Hel"));
    }

    #[test]
    fn test_line_split_across_feeds() {
        let mut parser = SseChunkParser::new();

        assert!(parser.feed(b"data: {\"choices\":[{\"delta\":").is_empty());
        assert!(parser.feed(b"{\"content\":\"x\"}}]}").is_empty());
        let chunks = parser.feed(b"\r\n\r\n");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_done_marker_stops_parsing() {
        let mut parser = SseChunkParser::new();
        let data = b"data: {\"choices\":[]}\n\ndata: [DONE]\n\ndata: {\"choices\":[]}\n\n";

        assert_eq!(parser.feed(data).len(), 1);
        assert!(parser.is_done());
        assert!(parser.feed(b"data: {\"choices\":[]}\n\n").is_empty());
    }

    #[test]
    fn test_comments_and_garbage_skipped() {
        let mut parser = SseChunkParser::new();
        let data = b": OPENROUTER PROCESSING\n\nevent: ping\ndata: not-json\n\ndata: {\"choices\":[]}\n\n";

        let chunks = parser.feed(data);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_ok());
    }

    #[test]
    fn test_error_payload_becomes_error_item() {
        let mut parser = SseChunkParser::new();
        let data = b"data: {\"error\":{\"message\":\"rate limited\",\"code\":429}}\n\n";

        let chunks = parser.feed(data);
        assert_eq!(chunks.len(), 1);
        match &chunks[0] {
            Err(RouterError::UpstreamError(message)) => assert_eq!(message, "rate limited"),
            other => panic!("Expected upstream error, got {:?}", other),
        }
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut parser = SseChunkParser::new();

        assert!(
            parser
                .feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}")
                .is_empty()
        );
        let chunks = parser.finish();
        assert_eq!(chunks.len(), 1);
        let chunk = chunks[0].as_ref().unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("tail"));

        assert!(parser.is_done());
        assert!(parser.finish().is_empty());
    }

    #[tokio::test]
    async fn test_chunk_stream_keeps_final_chunk() {
        let body = stream::iter(vec![
            Ok::<_, std::convert::Infallible>(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\ndata: {\"choi",
            )),
            Ok(Bytes::from_static(
                b"ces\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}",
            )),
        ]);

        let chunks: Vec<_> = chunk_stream(body).collect().await;

        assert_eq!(chunks.len(), 2);
        let last = chunks[1].as_ref().unwrap();
        assert_eq!(last.choices[0].finish_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn test_chunk_stream_reports_transport_error() {
        let body = stream::iter(vec![Err::<Bytes, _>("connection reset")]);

        let chunks: Vec<_> = chunk_stream(body).collect().await;

        assert_eq!(chunks.len(), 1);
        assert!(matches!(chunks[0], Err(RouterError::UpstreamError(_))));
    }
}
