//! Chat gateway client for OpenAI-compatible chat completions endpoints

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod provider;
pub mod sink;
pub mod stream;
pub mod types;

pub use client::ChatGateway;
pub use config::{GatewayConfig, build_gateway};
pub use error::{GatewayError, SinkError};
pub use metrics::GatewayMetrics;
pub use provider::ChatProvider;
pub use sink::{ChannelSink, FnSink, StreamSink};
pub use types::*;
