use serde_json::Value;
use std::collections::HashMap;

/// Outbound payload passed to `publish`/`forward`. Content-type
/// defaulting follows spec.md §4.3: raw bytes -> octet-stream, text ->
/// text/plain, structured -> JSON.
#[derive(Debug, Clone)]
pub enum Payload {
    Raw(Vec<u8>),
    Text(String),
    Json(Value),
}

impl Payload {
    pub fn default_content_type(&self) -> &'static str {
        match self {
            Payload::Raw(_) => "application/octet-stream",
            Payload::Text(_) => "text/plain",
            Payload::Json(_) => "application/json",
        }
    }

    pub fn into_bytes(self) -> anyhow::Result<Vec<u8>> {
        Ok(match self {
            Payload::Raw(bytes) => bytes,
            Payload::Text(text) => text.into_bytes(),
            Payload::Json(value) => serde_json::to_vec(&value)?,
        })
    }
}

/// Explicit overrides for `publish`/`forward`/`subscribe` (spec.md §9:
/// "callers pass a default-constructed overrides value rather than
/// omitting arguments").
#[derive(Debug, Clone, Default)]
pub struct PublishOverrides {
    pub message_id: Option<String>,
    pub content_type: Option<String>,
    pub routing_key: Option<String>,
    pub headers: HashMap<String, String>,
}

impl PublishOverrides {
    /// The `routingKey` shorthand: `overrides` accepted anywhere can be
    /// just a routing key string.
    pub fn routing_key(key: impl Into<String>) -> Self {
        Self {
            routing_key: Some(key.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubscribeOverrides {
    pub prefetch: Option<u16>,
    pub consumer_tag: Option<String>,
    pub defer_close_channel_ms: Option<u64>,
}

/// Result of a `publish`/`forward` call: either the broker acknowledged the
/// message, or it came back unroutable (spec.md §4.3/§6: `publish` emits
/// `success(messageId)` or `return(message)`, never silently drops either).
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    Success { message_id: String, duration_ms: u128 },
    Returned { message_id: String, reply_code: u16, reply_text: String },
}

impl PublishOutcome {
    pub fn message_id(&self) -> &str {
        match self {
            PublishOutcome::Success { message_id, .. } => message_id,
            PublishOutcome::Returned { message_id, .. } => message_id,
        }
    }
}

/// Metadata describing where an inbound message originated, required
/// to implement the forward contract (spec.md §4.3).
#[derive(Debug, Clone)]
pub struct DeliveredMessage {
    pub message_id: Option<String>,
    pub content_type: Option<String>,
    pub routing_key: String,
    pub exchange: String,
    pub queue: String,
    pub payload: Vec<u8>,
}
