use std::env;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::ChatGateway;
use crate::error::GatewayError;
use crate::http::DynHttpTransport;
use crate::metrics::GatewayMetrics;
use crate::provider::chat_completions::{ChatCompletionsProvider, DEFAULT_MODEL, DEFAULT_TIMEOUT};

pub const ENV_API_KEY: &str = "LLM_GATEWAY_API_KEY";
pub const ENV_BASE_URL: &str = "LLM_GATEWAY_BASE_URL";
pub const ENV_MODEL: &str = "LLM_GATEWAY_MODEL";
pub const ENV_TIMEOUT_SECS: &str = "LLM_GATEWAY_TIMEOUT_SECS";

/// Connection settings for the chat completions vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub api_key: String,
    /// Vendor root, with or without a trailing `/v1`.
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl GatewayConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Reads the configuration from `LLM_GATEWAY_*` variables.
    ///
    /// Returns `None` when the key or base URL is missing or blank.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`GatewayConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::new(non_blank(ENV_API_KEY)?, non_blank(ENV_BASE_URL)?);
        if let Some(model) = non_blank(ENV_MODEL) {
            config.model = model;
        }
        if let Some(raw) = non_blank(ENV_TIMEOUT_SECS) {
            match raw.parse() {
                Ok(secs) => config.timeout_secs = secs,
                Err(err) => warn!(
                    variable = ENV_TIMEOUT_SECS,
                    value = %raw,
                    error = %err,
                    "ignoring unparsable timeout"
                ),
            }
        }
        Some(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<(), GatewayError> {
        if self.api_key.trim().is_empty() {
            return Err(GatewayError::invalid_config("api_key", "must not be blank"));
        }
        if self.base_url.trim().is_empty() {
            return Err(GatewayError::invalid_config("base_url", "must not be blank"));
        }
        if self.model.trim().is_empty() {
            return Err(GatewayError::invalid_config("model", "must not be blank"));
        }
        if self.timeout_secs == 0 {
            return Err(GatewayError::invalid_config("timeout_secs", "must be positive"));
        }
        Ok(())
    }
}

/// Builds the gateway from optional configuration.
///
/// Without configuration the gateway is uninitialized and every call fails with
/// [`GatewayError::NotInitialized`]; the host keeps running.
pub fn build_gateway(
    config: Option<&GatewayConfig>,
    transport: DynHttpTransport,
    metrics: Arc<GatewayMetrics>,
) -> Result<ChatGateway, GatewayError> {
    let Some(config) = config else {
        warn!("chat gateway is not configured; chat calls will be rejected");
        return Ok(ChatGateway::uninitialized());
    };
    config.validate()?;

    let provider = ChatCompletionsProvider::new(
        transport,
        config.base_url.trim(),
        config.api_key.trim(),
        metrics,
    )
    .with_model(config.model.clone())
    .with_timeout(Some(config.timeout()));
    info!(
        endpoint = %provider.endpoint(),
        model = provider.model(),
        timeout_secs = config.timeout_secs,
        "chat gateway initialized"
    );

    Ok(ChatGateway::new(Arc::new(provider)))
}
