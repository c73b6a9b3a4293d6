//! Model backend boundary
//!
//! Inference is an opaque external call: the engine assembles messages and
//! options, invokes `generate`, and maps the response. Failures propagate
//! unchanged with no retry at this layer.

use crate::error::Result;
use crate::message::Message;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

/// Delta events from a streaming response. Forwarded to the stream target
/// supplied to `step`; backends that do not stream may ignore the sender.
#[derive(Debug, Clone)]
pub enum StreamDelta {
    /// Text content delta
    Text(String),
    /// Thinking/reasoning delta
    Thinking(String),
    /// Stream finished
    Done,
}

/// Options assembled for one `generate` call.
///
/// Not serializable as a whole (it carries a stream channel handle); the
/// backend driver decides what of this reaches the wire.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Tool ids the backend may dispatch to. Absent when the agent has none.
    pub tools: Option<Vec<String>>,
    /// Thinking effort, only when greater than zero.
    pub thinking_effort: Option<u32>,
    /// Forced tool choice, forwarded verbatim from step options.
    pub tool_call: Option<Value>,
    /// Tool name to JSON schema. Delegate schemas are merged last and win
    /// on name collision.
    pub tool_schemas: IndexMap<String, Value>,
    /// Stream target for incremental deltas.
    pub stream: Option<UnboundedSender<StreamDelta>>,
}

/// Token counts reported by the backend for one exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub thinking_tokens: u64,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments,
        }
    }

    /// String argument by key, if present.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// One backend response. All fields optional; the runtime fills in defaults
/// when mapping this into a step result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Completion {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub tokens: Option<TokenCounts>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub meta: Option<Value>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// Inference contract for the language-model collaborator.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Run one request/response exchange.
    async fn generate(&self, messages: &[Message], options: &GenerateOptions)
        -> Result<Completion>;
}
