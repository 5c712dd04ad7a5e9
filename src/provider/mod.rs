use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::GatewayError;
use crate::sink::StreamSink;
use crate::types::{ChatRequest, ChatResponse};

pub mod chat_completions;

/// A chat backend able to answer both aggregated and streaming calls.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Sends the full request and waits for the aggregated response.
    async fn chat(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, GatewayError>;

    /// Streams incremental deltas into `sink` until the vendor ends the stream.
    ///
    /// Events already delivered when an error is returned remain valid.
    async fn stream_chat(
        &self,
        request: &ChatRequest,
        sink: &mut dyn StreamSink,
        cancel: &CancellationToken,
    ) -> Result<(), GatewayError>;

    /// Provider name used in logs.
    fn name(&self) -> &'static str;
}

/// Thread-safe provider handle.
pub type DynProvider = Arc<dyn ChatProvider>;

/// Races `future` against `cancel`; cancellation wins ties.
pub(crate) async fn or_cancelled<F>(
    cancel: &CancellationToken,
    future: F,
) -> Result<F::Output, GatewayError>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GatewayError::cancelled()),
        output = future => Ok(output),
    }
}
