//! OpenAI-compatible Chat Completions vendor (DeepSeek and friends).

mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::{ChatCompletionsProvider, DEFAULT_MODEL, DEFAULT_TIMEOUT};
