use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::GatewayError;
use crate::provider::DynProvider;
use crate::sink::StreamSink;
use crate::types::{ChatRequest, ChatResponse};

/// Entry point for chat calls.
///
/// Built once at startup and shared across concurrent calls; it keeps no conversation
/// state. A gateway built without configuration is uninitialized and rejects every call
/// with [`GatewayError::NotInitialized`] before touching the network.
#[derive(Clone)]
pub struct ChatGateway {
    provider: Option<DynProvider>,
}

impl ChatGateway {
    pub fn new(provider: DynProvider) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// A gateway with no backing provider.
    pub fn uninitialized() -> Self {
        Self { provider: None }
    }

    pub fn is_initialized(&self) -> bool {
        self.provider.is_some()
    }

    /// Sends a chat request and waits for the aggregated response.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, GatewayError> {
        self.chat_cancellable(request, &CancellationToken::new())
            .await
    }

    /// Like [`ChatGateway::chat`], aborting with a transport error once `cancel` fires.
    pub async fn chat_cancellable(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, GatewayError> {
        let provider = self.provider()?;
        info!(session_id = %request.session_id, provider = provider.name(), "chat");
        provider.chat(request, cancel).await
    }

    /// Streams response deltas into `sink`.
    ///
    /// Events delivered before an error remain valid; nothing is delivered after the
    /// call returns.
    pub async fn stream_chat(
        &self,
        request: &ChatRequest,
        sink: &mut dyn StreamSink,
    ) -> Result<(), GatewayError> {
        self.stream_chat_cancellable(request, sink, &CancellationToken::new())
            .await
    }

    /// Like [`ChatGateway::stream_chat`], aborting with a transport error once `cancel` fires.
    pub async fn stream_chat_cancellable(
        &self,
        request: &ChatRequest,
        sink: &mut dyn StreamSink,
        cancel: &CancellationToken,
    ) -> Result<(), GatewayError> {
        let provider = self.provider()?;
        info!(session_id = %request.session_id, provider = provider.name(), "stream chat");
        provider.stream_chat(request, sink, cancel).await
    }

    fn provider(&self) -> Result<&DynProvider, GatewayError> {
        self.provider.as_ref().ok_or(GatewayError::NotInitialized)
    }
}
