//! Decoding of the `/api/query/stream` server-sent event body.
//!
//! The backend writes one JSON object per `data:` line. Each line is decoded
//! as soon as its newline arrives, with or without a blank separator, and the
//! stream always ends with exactly one terminal event.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use ragchat_core::backend::{EventStream, StreamEvent};
use tokio::time::timeout;
use tracing::{trace, warn};

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

struct Decoder {
    inner: BoxStream<'static, Result<Vec<u8>, String>>,
    /// Bytes of the current, not yet terminated line.
    line: Vec<u8>,
    pending: VecDeque<StreamEvent>,
    idle_timeout: Duration,
    body_done: bool,
}

impl Decoder {
    fn push_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if byte == b'\n' {
                let line = std::mem::take(&mut self.line);
                self.push_line(&String::from_utf8_lossy(&line));
            } else {
                self.line.push(byte);
            }
        }
    }

    /// Decodes a trailing line the body ended without terminating.
    fn flush(&mut self) {
        if !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            self.push_line(&String::from_utf8_lossy(&line));
        }
    }

    /// Queues the event carried by one line; other SSE fields and comments
    /// are ignored.
    fn push_line(&mut self, line: &str) {
        let Some(payload) = line.trim_end_matches('\r').strip_prefix(DATA_PREFIX) else {
            return;
        };
        let payload = payload.trim();
        if payload.is_empty() || payload == DONE_MARKER {
            return;
        }
        trace!(data = payload, "SSE data line");
        match serde_json::from_str::<StreamEvent>(payload) {
            Ok(event) => self.pending.push_back(event),
            Err(err) => warn!(error = %err, payload, "Skipping malformed stream event"),
        }
    }
}

/// Turns a streamed response body into answer events.
///
/// The returned stream is lazy and single-pass. It ends right after the first
/// `Complete` or `Error` event. Transport errors, an idle period longer than
/// `idle_timeout`, or a body that ends early each produce one `Error` event.
pub fn decode_events<S, B, E>(body: S, idle_timeout: Duration) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let decoder = Decoder {
        inner: body
            .map(|chunk| chunk.map(|bytes| bytes.as_ref().to_vec()).map_err(|err| err.to_string()))
            .boxed(),
        line: Vec::new(),
        pending: VecDeque::new(),
        idle_timeout,
        body_done: false,
    };

    stream::unfold(Some(decoder), |state| async move {
        let mut decoder = state?;
        loop {
            if let Some(event) = decoder.pending.pop_front() {
                let next = if event.is_terminal() {
                    None
                } else {
                    Some(decoder)
                };
                return Some((event, next));
            }

            if decoder.body_done {
                warn!("Answer stream closed without a completion event");
                return Some((
                    StreamEvent::error("Stream ended before the answer was complete"),
                    None,
                ));
            }

            match timeout(decoder.idle_timeout, decoder.inner.next()).await {
                Ok(Some(Ok(bytes))) => decoder.push_bytes(&bytes),
                Ok(Some(Err(err))) => {
                    warn!(error = %err, "Answer stream interrupted");
                    return Some((
                        StreamEvent::error(format!("Stream interrupted: {}", err)),
                        None,
                    ));
                }
                Ok(None) => {
                    decoder.flush();
                    decoder.body_done = true;
                }
                Err(_) => {
                    warn!(
                        timeout_secs = decoder.idle_timeout.as_secs(),
                        "Answer stream idle timeout"
                    );
                    return Some((
                        StreamEvent::error(format!(
                            "Stream timed out after {}s without data",
                            decoder.idle_timeout.as_secs()
                        )),
                        None,
                    ));
                }
            }
        }
    })
    .boxed()
}

/// A stream holding a single terminal error event.
pub fn failed_stream(message: impl Into<String>) -> EventStream {
    stream::once(futures::future::ready(StreamEvent::error(message))).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(parts: &[&str]) -> impl Stream<Item = Result<Vec<u8>, String>> + Send + 'static {
        let owned: Vec<Result<Vec<u8>, String>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(owned)
    }

    async fn collect(parts: &[&str]) -> Vec<StreamEvent> {
        decode_events(body(parts), Duration::from_secs(5))
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_chunks_then_complete() {
        let events = collect(&[
            "data: {\"type\":\"chunk\",\"content\":\"Hel\"}\n\n",
            "data: {\"type\":\"chunk\",\"content\":\"lo\"}\n\n",
            "data: {\"type\":\"complete\",\"session_id\":\"s1\",\"sources\":[\"doc1.pdf\"],\"document_count\":1}\n\n",
        ])
        .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::chunk("Hel"),
                StreamEvent::chunk("lo"),
                StreamEvent::complete(Some("s1".to_string()), vec!["doc1.pdf".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_event_split_across_reads() {
        let events = collect(&[
            "data: {\"type\":\"chu",
            "nk\",\"content\":\"A\"}\n",
            "\ndata: {\"type\":\"error\",\"content\":\"boom\"}\n\n",
        ])
        .await;

        assert_eq!(events, vec![StreamEvent::chunk("A"), StreamEvent::error("boom")]);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let events = collect(&[
            "data: not json\n\n",
            "data: {\"type\":\"chunk\",\"content\":\"ok\"}\n\n",
            ": keep-alive comment\n\n",
            "data: {\"type\":\"complete\"}\n\n",
        ])
        .await;

        assert_eq!(
            events,
            vec![StreamEvent::chunk("ok"), StreamEvent::complete(None, vec![])]
        );
    }

    #[tokio::test]
    async fn test_unseparated_data_lines() {
        let events = collect(&[concat!(
            "data: {\"type\":\"chunk\",\"content\":\"a\"}\n",
            "data: {\"type\":\"chunk\",\"content\":\"b\"}\n",
            "data: {\"type\":\"complete\"}\n\n",
        )])
        .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::chunk("a"),
                StreamEvent::chunk("b"),
                StreamEvent::complete(None, vec![]),
            ]
        );
    }

    #[tokio::test]
    async fn test_single_newline_framing() {
        let events = collect(&[
            "data: {\"type\":\"chunk\",\"content\":\"Hel\"}\n",
            "data: {\"type\":\"chunk\",\"content\":\"lo\"}\n",
            "data: {\"type\":\"complete\",\"sources\":[\"doc1.pdf\"]}\n",
        ])
        .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::chunk("Hel"),
                StreamEvent::chunk("lo"),
                StreamEvent::complete(None, vec!["doc1.pdf".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_last_event_without_separator() {
        let events = collect(&[
            "data: {\"type\":\"chunk\",\"content\":\"Hel\"}\n\n",
            "data: {\"type\":\"chunk\",\"content\":\"lo\"}\r\n\r\n",
            "data: {\"type\":\"complete\",\"sources\":[\"doc1.pdf\"]}",
        ])
        .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::chunk("Hel"),
                StreamEvent::chunk("lo"),
                StreamEvent::complete(None, vec!["doc1.pdf".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_chunk_is_emitted_before_body_ends() {
        let head = stream::iter(vec![Ok::<_, String>(
            b"data: {\"type\":\"chunk\",\"content\":\"early\"}\n".to_vec(),
        )]);
        let body = head.chain(stream::pending());
        let mut events = decode_events(body, Duration::from_secs(5));

        assert_eq!(events.next().await, Some(StreamEvent::chunk("early")));
    }

    #[tokio::test]
    async fn test_nothing_after_terminal_event() {
        let events = collect(&[
            "data: {\"type\":\"error\",\"content\":\"quota\"}\n\n",
            "data: {\"type\":\"chunk\",\"content\":\"late\"}\n\n",
        ])
        .await;

        assert_eq!(events, vec![StreamEvent::error("quota")]);
    }

    #[tokio::test]
    async fn test_early_end_yields_error() {
        let events = collect(&["data: {\"type\":\"chunk\",\"content\":\"partial\"}\n\n"]).await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StreamEvent::chunk("partial"));
        assert!(matches!(&events[1], StreamEvent::Error { content } if content.contains("ended")));
    }

    #[tokio::test]
    async fn test_transport_error_yields_single_error() {
        let parts: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"data: {\"type\":\"chunk\",\"content\":\"x\"}\n\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"data: {\"type\":\"chunk\",\"content\":\"y\"}\n\n".to_vec()),
        ];
        let events: Vec<StreamEvent> = decode_events(stream::iter(parts), Duration::from_secs(5))
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], StreamEvent::Error { content } if content.contains("connection reset")));
    }

    #[tokio::test]
    async fn test_idle_timeout() {
        let stalled = stream::pending::<Result<Vec<u8>, String>>();
        let events: Vec<StreamEvent> = decode_events(stalled, Duration::from_millis(20))
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StreamEvent::Error { content } if content.contains("timed out")));
    }

    #[tokio::test]
    async fn test_failed_stream() {
        let events: Vec<StreamEvent> = failed_stream("Backend error: 502").collect().await;
        assert_eq!(events, vec![StreamEvent::error("Backend error: 502")]);
    }
}
