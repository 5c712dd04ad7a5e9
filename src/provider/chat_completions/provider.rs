use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::GatewayError;
use crate::http::{DynHttpTransport, HttpRequest, encode_json_request};
use crate::metrics::{Endpoint, GatewayMetrics, Outcome};
use crate::provider::{ChatProvider, or_cancelled};
use crate::sink::StreamSink;
use crate::types::{ChatRequest, ChatResponse};

use super::request::to_vendor_request;
use super::response::from_vendor_response;
use super::stream::{collect_body_text, pump_events};
use super::types::VendorResponse;

pub const DEFAULT_MODEL: &str = "deepseek-r1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// The model is fixed at construction; callers only supply messages and sampling
/// parameters. Each call is a single attempt with no retries.
pub struct ChatCompletionsProvider {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) timeout: Option<Duration>,
    pub(crate) metrics: Arc<GatewayMetrics>,
}

impl ChatCompletionsProvider {
    /// Creates a provider for `base_url` authenticated with a static bearer key.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use llm_chat_gateway::http::reqwest::default_dyn_transport;
    /// # use llm_chat_gateway::metrics::GatewayMetrics;
    /// # use llm_chat_gateway::provider::chat_completions::ChatCompletionsProvider;
    /// let transport = default_dyn_transport().unwrap();
    /// let metrics = Arc::new(GatewayMetrics::standalone().unwrap());
    /// let provider = ChatCompletionsProvider::new(transport, "https://api.deepseek.com/", "key", metrics);
    /// assert_eq!(provider.endpoint(), "https://api.deepseek.com/v1/chat/completions");
    /// ```
    pub fn new(
        transport: DynHttpTransport,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
            metrics,
        }
    }

    /// Overrides the vendor model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the bound on a whole exchange. `None` disables it.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.api_key),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ])
    }

    fn build_http_request(
        &self,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<HttpRequest, GatewayError> {
        let body = to_vendor_request(request, &self.model, stream);
        let http_request = encode_json_request(self.endpoint(), self.build_headers(), &body)
            .inspect_err(|err| {
                error!(session_id = %request.session_id, error = %err, "failed to encode request");
            })?;
        Ok(http_request.with_timeout(self.timeout))
    }

    /// Counts and logs a failure that reached the vendor HTTP layer.
    fn fail(&self, endpoint: Endpoint, session_id: &str, err: GatewayError) -> GatewayError {
        self.metrics.record_outcome(endpoint, Outcome::Error);
        error!(
            session_id,
            endpoint = endpoint.as_str(),
            error = %err,
            "chat completion request failed"
        );
        err
    }
}

#[async_trait]
impl ChatProvider for ChatCompletionsProvider {
    async fn chat(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, GatewayError> {
        let endpoint = Endpoint::Chat;
        let started = Instant::now();
        let http_request = self.build_http_request(request, false)?;
        debug!(session_id = %request.session_id, url = %http_request.url, "sending chat completion request");

        let response = match or_cancelled(cancel, self.transport.send(http_request))
            .await
            .and_then(|result| result)
        {
            Ok(response) => response,
            Err(err) => return Err(self.fail(endpoint, &request.session_id, err)),
        };
        let elapsed = started.elapsed();

        if !response.is_success() {
            let err = GatewayError::Vendor {
                status: response.status,
                body: response.body_text(),
            };
            return Err(self.fail(endpoint, &request.session_id, err));
        }

        let parsed: VendorResponse = match serde_json::from_slice(&response.body) {
            Ok(parsed) => parsed,
            Err(err) => {
                let err = GatewayError::Decoding {
                    message: format!("failed to parse chat completion response: {err}"),
                };
                return Err(self.fail(endpoint, &request.session_id, err));
            }
        };

        let mapped = from_vendor_response(parsed, &request.session_id);
        self.metrics.record_outcome(endpoint, Outcome::Success);
        self.metrics.observe_latency(endpoint, elapsed);
        if let Some(usage) = &mapped.token_usage {
            self.metrics.set_token_usage(usage);
        }
        Ok(mapped)
    }

    async fn stream_chat(
        &self,
        request: &ChatRequest,
        sink: &mut dyn StreamSink,
        cancel: &CancellationToken,
    ) -> Result<(), GatewayError> {
        let endpoint = Endpoint::StreamChat;
        let started = Instant::now();
        let http_request = self.build_http_request(request, true)?;
        debug!(session_id = %request.session_id, url = %http_request.url, "opening chat completion stream");

        let response = match or_cancelled(cancel, self.transport.send_stream(http_request))
            .await
            .and_then(|result| result)
        {
            Ok(response) => response,
            Err(err) => return Err(self.fail(endpoint, &request.session_id, err)),
        };

        if !response.is_success() {
            let status = response.status;
            let body = collect_body_text(response.body, cancel).await;
            let err = GatewayError::Vendor { status, body };
            return Err(self.fail(endpoint, &request.session_id, err));
        }
        self.metrics.observe_latency(endpoint, started.elapsed());

        match pump_events(response.body, &request.session_id, sink, cancel).await {
            Ok(delivered) => {
                self.metrics.record_outcome(endpoint, Outcome::Success);
                debug!(session_id = %request.session_id, delivered, "chat completion stream finished");
                Ok(())
            }
            Err(err) => Err(self.fail(endpoint, &request.session_id, err)),
        }
    }

    fn name(&self) -> &'static str {
        "chat_completions"
    }
}
