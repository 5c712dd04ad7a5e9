use crate::types::{ChatMessage, ChatRequest};

use super::types::{VendorMessage, VendorRequest};

/// Maps a caller request onto the vendor wire shape. Total: never fails.
///
/// Message order is preserved. A `max_tokens` of zero means "provider default" and is
/// left out of the body, as are unset sampling parameters.
pub(crate) fn to_vendor_request(request: &ChatRequest, model: &str, stream: bool) -> VendorRequest {
    VendorRequest {
        model: model.to_string(),
        messages: request.messages.iter().map(convert_message).collect(),
        temperature: request.temperature,
        top_p: request.top_p,
        max_tokens: request.max_tokens.filter(|max| *max > 0),
        stream,
    }
}

fn convert_message(message: &ChatMessage) -> VendorMessage {
    VendorMessage {
        role: message.role(),
        content: message.content().to_string(),
    }
}
