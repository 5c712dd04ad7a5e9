use serde::{Deserialize, Serialize};

use crate::types::Role;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub(crate) struct VendorRequest {
    pub(crate) model: String,
    pub(crate) messages: Vec<VendorMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) max_tokens: Option<u32>,
    pub(crate) stream: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub(crate) struct VendorMessage {
    pub(crate) role: Role,
    pub(crate) content: String,
}

// Missing fields decode to defaults; only malformed JSON is a decoding failure.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
#[allow(dead_code)]
pub(crate) struct VendorResponse {
    pub(crate) id: String,
    pub(crate) object: String,
    pub(crate) created: i64,
    pub(crate) model: String,
    pub(crate) choices: Vec<VendorChoice>,
    pub(crate) usage: Option<VendorUsage>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
#[allow(dead_code)]
pub(crate) struct VendorChoice {
    pub(crate) index: u32,
    pub(crate) message: Option<VendorResponseMessage>,
    pub(crate) finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
#[allow(dead_code)]
pub(crate) struct VendorResponseMessage {
    pub(crate) role: Option<String>,
    pub(crate) content: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone, Copy)]
#[serde(default)]
pub(crate) struct VendorUsage {
    pub(crate) prompt_tokens: u32,
    pub(crate) completion_tokens: u32,
    pub(crate) total_tokens: u32,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
#[allow(dead_code)]
pub(crate) struct VendorStreamChunk {
    pub(crate) id: String,
    pub(crate) object: String,
    pub(crate) created: i64,
    pub(crate) model: String,
    pub(crate) choices: Vec<VendorStreamChoice>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
#[allow(dead_code)]
pub(crate) struct VendorStreamChoice {
    pub(crate) index: u32,
    pub(crate) delta: Option<VendorDelta>,
    pub(crate) finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
#[allow(dead_code)]
pub(crate) struct VendorDelta {
    pub(crate) role: Option<String>,
    pub(crate) content: Option<String>,
}
