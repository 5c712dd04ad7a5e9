//! Consumers of streamed chat deltas.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::SinkError;
use crate::types::StreamEvent;

/// Receives each [`StreamEvent`] of a streaming call, one at a time and in order.
///
/// Returning an error aborts the stream: no further lines are read and the call fails
/// with [`crate::error::GatewayError::SinkAbort`].
#[async_trait]
pub trait StreamSink: Send {
    async fn deliver(&mut self, event: StreamEvent) -> Result<(), SinkError>;
}

/// Adapts a synchronous closure into a [`StreamSink`].
///
/// # Examples
///
/// ```
/// use llm_chat_gateway::sink::{FnSink, StreamSink};
/// use llm_chat_gateway::types::StreamEvent;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let mut seen = Vec::new();
/// let mut sink = FnSink::new(|event: StreamEvent| {
///     seen.push(event.content);
///     Ok(())
/// });
/// sink.deliver(StreamEvent { session_id: "s".into(), content: "hi".into(), model: "m".into() })
///     .await
///     .unwrap();
/// drop(sink);
/// assert_eq!(seen, vec!["hi".to_string()]);
/// # });
/// ```
pub struct FnSink<F> {
    callback: F,
}

impl<F> FnSink<F>
where
    F: FnMut(StreamEvent) -> Result<(), SinkError> + Send,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl<F> StreamSink for FnSink<F>
where
    F: FnMut(StreamEvent) -> Result<(), SinkError> + Send,
{
    async fn deliver(&mut self, event: StreamEvent) -> Result<(), SinkError> {
        (self.callback)(event)
    }
}

/// Forwards events into a bounded channel.
///
/// A full channel applies back-pressure to the stream; a dropped receiver aborts it
/// with [`SinkError::disconnected`].
pub struct ChannelSink {
    sender: mpsc::Sender<StreamEvent>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<StreamEvent>) -> Self {
        Self { sender }
    }

    /// Creates a sink and the receiving half of a channel holding `capacity` events.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl StreamSink for ChannelSink {
    async fn deliver(&mut self, event: StreamEvent) -> Result<(), SinkError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| SinkError::disconnected())
    }
}
