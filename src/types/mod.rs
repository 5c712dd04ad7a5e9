//! Provider-agnostic chat data model.
//!
//! These are request-scoped value objects: built by the caller, read by the gateway,
//! discarded once the call returns.

use serde::{Deserialize, Serialize};

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single conversational turn. Immutable once constructed.
///
/// # Examples
///
/// ```
/// use llm_chat_gateway::types::{ChatMessage, Role};
///
/// let msg = ChatMessage::user("hello");
/// assert_eq!(msg.role(), Role::User);
/// assert_eq!(msg.content(), "hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    role: Role,
    content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Chat request as issued by the caller.
///
/// `session_id` is an opaque correlation key copied onto every response and never
/// interpreted. `messages` are kept in conversational order. Sampling parameters left
/// as `None` (and a `max_tokens` of zero) fall back to the provider defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Starts a request for the given session with no messages.
    ///
    /// # Examples
    ///
    /// ```
    /// use llm_chat_gateway::types::{ChatMessage, ChatRequest};
    ///
    /// let request = ChatRequest::new("session-1")
    ///     .with_message(ChatMessage::system("be brief"))
    ///     .with_message(ChatMessage::user("hi"))
    ///     .with_temperature(0.7);
    /// assert_eq!(request.messages.len(), 2);
    /// assert_eq!(request.temperature, Some(0.7));
    /// ```
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token accounting reported by the vendor.
///
/// `total_tokens` is expected to equal `prompt_tokens + completion_tokens` by vendor
/// contract; the gateway copies the values verbatim without checking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Aggregated chat response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Copied from the request, never from the vendor.
    pub session_id: String,
    pub content: String,
    /// Vendor model identifier.
    pub model: String,
    /// Present on aggregated responses only; streaming deltas carry none.
    pub token_usage: Option<TokenUsage>,
}

/// Incremental content fragment delivered to a [`crate::sink::StreamSink`].
///
/// `content` holds only the text generated since the previous event of the same call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub session_id: String,
    pub content: String,
    pub model: String,
}

impl From<StreamEvent> for ChatResponse {
    fn from(event: StreamEvent) -> Self {
        ChatResponse {
            session_id: event.session_id,
            content: event.content,
            model: event.model,
            token_usage: None,
        }
    }
}
