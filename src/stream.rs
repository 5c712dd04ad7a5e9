use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::error::GatewayError;
use crate::http::HttpBodyStream;

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "data: [DONE]";

/// One meaningful line of a server-sent-event body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Payload following the `data: ` prefix.
    Data(String),
    /// Terminal `data: [DONE]` marker.
    Done,
}

/// Classifies one line of an SSE body.
///
/// Surrounding whitespace is trimmed. Blank lines and lines without the `data: ` prefix
/// (comments, keep-alives, `event:` fields) yield `None`.
///
/// # Examples
///
/// ```
/// use llm_chat_gateway::stream::{parse_line, SseEvent};
///
/// assert_eq!(parse_line("data: {\"a\":1}\r"), Some(SseEvent::Data("{\"a\":1}".into())));
/// assert_eq!(parse_line("  data: [DONE]  "), Some(SseEvent::Done));
/// assert_eq!(parse_line(": keep-alive"), None);
/// assert_eq!(parse_line(""), None);
/// ```
pub fn parse_line(line: &str) -> Option<SseEvent> {
    let line = line.trim();
    if line == DONE_MARKER {
        return Some(SseEvent::Done);
    }
    line.strip_prefix(DATA_PREFIX)
        .map(|data| SseEvent::Data(data.to_string()))
}

/// Splits a raw HTTP body stream into newline-delimited [`SseEvent`]s.
///
/// The decoder stops after the first [`SseEvent::Done`]. A trailing line without a
/// final newline is still decoded when the body ends. Invalid UTF-8 is replaced rather
/// than rejected so the line can fail (and be skipped) at JSON decoding instead.
pub struct StreamDecoder {
    body: HttpBodyStream,
    buffer: Vec<u8>,
    pending: VecDeque<SseEvent>,
    stream_closed: bool,
    done_received: bool,
}

impl StreamDecoder {
    pub fn new(body: HttpBodyStream) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            pending: VecDeque::new(),
            stream_closed: false,
            done_received: false,
        }
    }

    fn handle_line(&mut self, line: &[u8]) {
        if self.done_received {
            return;
        }
        let text = String::from_utf8_lossy(line);
        if let Some(event) = parse_line(&text) {
            if event == SseEvent::Done {
                self.done_received = true;
            }
            self.pending.push_back(event);
        }
    }

    fn drain_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
        buffer.iter().position(|b| *b == b'\n').map(|pos| {
            let mut line: Vec<u8> = buffer.drain(..=pos).collect();
            line.pop();
            line
        })
    }
}

impl Stream for StreamDecoder {
    type Item = Result<SseEvent, GatewayError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }

            if this.done_received || this.stream_closed {
                return Poll::Ready(None);
            }

            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffer.extend_from_slice(&bytes);
                    while let Some(line) = Self::drain_line(&mut this.buffer) {
                        this.handle_line(&line);
                    }
                }
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(err))),
                Poll::Ready(None) => {
                    this.stream_closed = true;
                    if !this.buffer.is_empty() {
                        let line = std::mem::take(&mut this.buffer);
                        this.handle_line(&line);
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
