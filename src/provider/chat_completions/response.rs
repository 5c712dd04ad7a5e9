use crate::types::{ChatResponse, StreamEvent, TokenUsage};

use super::types::{VendorResponse, VendorStreamChunk, VendorUsage};

/// Maps an aggregated vendor response back to the caller's shape.
///
/// Only the first choice is read; a response without choices yields empty content.
/// The session id comes from the request, never from the vendor.
pub(crate) fn from_vendor_response(resp: VendorResponse, session_id: &str) -> ChatResponse {
    let content = resp
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .unwrap_or_default();
    ChatResponse {
        session_id: session_id.to_string(),
        content,
        model: resp.model,
        token_usage: Some(convert_usage(resp.usage.unwrap_or_default())),
    }
}

pub(crate) fn convert_usage(usage: VendorUsage) -> TokenUsage {
    TokenUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}

/// Builds the [`StreamEvent`] for one decoded chunk.
///
/// `model` holds the identifier captured so far; it is filled from the first chunk that
/// carries one and reused afterwards. `finish_reason` is not forwarded.
pub(crate) fn stream_event(
    chunk: VendorStreamChunk,
    session_id: &str,
    model: &mut String,
) -> StreamEvent {
    if model.is_empty() {
        *model = chunk.model;
    }
    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .unwrap_or_default();
    StreamEvent {
        session_id: session_id.to_string(),
        content,
        model: model.clone(),
    }
}
