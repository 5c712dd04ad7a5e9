//! Prometheus instruments shared by the synchronous and streaming invokers.
//!
//! Every update is fire-and-forget: label lookups that fail are logged and dropped so
//! instrumentation can never fail or block a call.

use std::time::Duration;

use prometheus::{
    GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use tracing::warn;

use crate::error::GatewayError;
use crate::types::TokenUsage;

const REQUESTS_TOTAL: &str = "llm_gateway_requests_total";
const REQUEST_DURATION: &str = "llm_gateway_request_duration_seconds";
const TOKEN_USAGE: &str = "llm_gateway_token_usage";

/// Gateway operation a metric sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Chat,
    StreamChat,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Chat => "chat",
            Endpoint::StreamChat => "stream-chat",
        }
    }
}

/// Result label of the request counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Error => "error",
        }
    }
}

/// Which token-usage gauge to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Prompt,
    Completion,
    Total,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Prompt => "prompt",
            TokenKind::Completion => "completion",
            TokenKind::Total => "total",
        }
    }
}

/// Request counter, latency histogram and token-usage gauge for the gateway.
///
/// The instruments are registered into the registry passed at construction, which is
/// kept for [`GatewayMetrics::render`]. Share one instance through an `Arc`.
#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,
    requests: IntCounterVec,
    latency: HistogramVec,
    token_usage: GaugeVec,
}

impl GatewayMetrics {
    /// Creates the instruments and registers them into `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidConfig`] when the instruments cannot be created or
    /// the registry already holds metrics with the same names.
    ///
    /// # Examples
    ///
    /// ```
    /// use llm_chat_gateway::metrics::{Endpoint, GatewayMetrics, Outcome};
    /// use prometheus::Registry;
    ///
    /// let metrics = GatewayMetrics::new(&Registry::new()).unwrap();
    /// metrics.record_outcome(Endpoint::Chat, Outcome::Success);
    /// assert_eq!(metrics.request_count(Endpoint::Chat, Outcome::Success), 1);
    /// ```
    pub fn new(registry: &Registry) -> Result<Self, GatewayError> {
        let requests = IntCounterVec::new(
            Opts::new(REQUESTS_TOTAL, "Total number of chat gateway requests"),
            &["outcome", "endpoint"],
        )
        .map_err(registration_error)?;
        let latency = HistogramVec::new(
            HistogramOpts::new(REQUEST_DURATION, "Duration of chat gateway requests in seconds")
                .buckets(prometheus::DEFAULT_BUCKETS.to_vec()),
            &["endpoint"],
        )
        .map_err(registration_error)?;
        let token_usage = GaugeVec::new(
            Opts::new(TOKEN_USAGE, "Token usage of the most recent chat request"),
            &["type"],
        )
        .map_err(registration_error)?;

        registry
            .register(Box::new(requests.clone()))
            .map_err(registration_error)?;
        registry
            .register(Box::new(latency.clone()))
            .map_err(registration_error)?;
        registry
            .register(Box::new(token_usage.clone()))
            .map_err(registration_error)?;

        Ok(Self {
            registry: registry.clone(),
            requests,
            latency,
            token_usage,
        })
    }

    /// Instruments registered into a private registry.
    pub fn standalone() -> Result<Self, GatewayError> {
        Self::new(&Registry::new())
    }

    pub fn record_outcome(&self, endpoint: Endpoint, outcome: Outcome) {
        match self
            .requests
            .get_metric_with_label_values(&[outcome.as_str(), endpoint.as_str()])
        {
            Ok(counter) => counter.inc(),
            Err(err) => warn!(error = %err, metric = REQUESTS_TOTAL, "failed to record metric"),
        }
    }

    pub fn observe_latency(&self, endpoint: Endpoint, elapsed: Duration) {
        match self
            .latency
            .get_metric_with_label_values(&[endpoint.as_str()])
        {
            Ok(histogram) => histogram.observe(elapsed.as_secs_f64()),
            Err(err) => warn!(error = %err, metric = REQUEST_DURATION, "failed to record metric"),
        }
    }

    /// Overwrites the token-usage gauges with the values of the latest call.
    pub fn set_token_usage(&self, usage: &TokenUsage) {
        for (kind, value) in [
            (TokenKind::Prompt, usage.prompt_tokens),
            (TokenKind::Completion, usage.completion_tokens),
            (TokenKind::Total, usage.total_tokens),
        ] {
            match self.token_usage.get_metric_with_label_values(&[kind.as_str()]) {
                Ok(gauge) => gauge.set(f64::from(value)),
                Err(err) => warn!(error = %err, metric = TOKEN_USAGE, "failed to record metric"),
            }
        }
    }

    pub fn request_count(&self, endpoint: Endpoint, outcome: Outcome) -> u64 {
        self.requests
            .get_metric_with_label_values(&[outcome.as_str(), endpoint.as_str()])
            .map(|counter| counter.get())
            .unwrap_or_default()
    }

    pub fn latency_sample_count(&self, endpoint: Endpoint) -> u64 {
        self.latency
            .get_metric_with_label_values(&[endpoint.as_str()])
            .map(|histogram| histogram.get_sample_count())
            .unwrap_or_default()
    }

    pub fn token_usage(&self, kind: TokenKind) -> f64 {
        self.token_usage
            .get_metric_with_label_values(&[kind.as_str()])
            .map(|gauge| gauge.get())
            .unwrap_or_default()
    }

    /// Renders the owning registry in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, GatewayError> {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .map_err(|err| GatewayError::invalid_config("metrics", err.to_string()))
    }
}

fn registration_error(err: prometheus::Error) -> GatewayError {
    GatewayError::invalid_config("metrics", err.to_string())
}
