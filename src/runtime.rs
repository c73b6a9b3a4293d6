//! Agent runtime
//!
//! One long-lived mutable instance per resolved spec. Construction builds
//! the system message and the delegate routing table once; each `step`
//! drives a single request/response exchange against the backend, merges
//! static and dynamic tool schemas, intercepts delegate tool calls before
//! they reach the caller, and keeps running token totals.
//!
//! One exchange in flight per instance: `step` takes `&mut self`, so the
//! borrow checker enforces what the design assumes. Resolutions, by
//! contrast, are read-only and safe to run concurrently.

use crate::backend::{Backend, GenerateOptions, StreamDelta, TokenCounts, ToolCall};
use crate::error::{Error, Result};
use crate::message::{Message, MessageSource};
use crate::resolver::{AgentSpec, DelegateSpec};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Running token totals across steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTotals {
    pub prompt: u64,
    pub completion: u64,
    pub thinking: u64,
    pub total: u64,
}

impl TokenTotals {
    /// Fold one exchange's counts into the running totals. `total` is
    /// recomputed from the three running sums, never taken from the backend.
    pub fn add(&mut self, counts: &TokenCounts) {
        self.prompt += counts.prompt_tokens;
        self.completion += counts.completion_tokens;
        self.thinking += counts.thinking_tokens;
        self.total = self.prompt + self.completion + self.thinking;
    }
}

/// Per-step options supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct StepOptions {
    /// Forced tool choice, forwarded verbatim to the backend.
    pub tool_call: Option<Value>,
}

/// Result of one exchange step.
///
/// Delegation and ordinary tool calls are mutually exclusive: when a
/// delegate call is intercepted, `tool_calls` is cleared and the
/// `delegate_*` fields carry the routing outcome instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepResult {
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenCounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
}

impl StepResult {
    pub fn is_delegation(&self) -> bool {
        self.delegate_target.is_some()
    }
}

/// Stats snapshot, a pure read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeStats {
    pub id: String,
    pub name: String,
    pub messages_handled: u64,
    pub total_tokens: TokenTotals,
}

pub struct AgentRuntime {
    spec: AgentSpec,
    backend: Arc<dyn Backend>,
    /// Copy of the spec's resolved tool ids.
    tool_ids: Vec<String>,
    /// Dynamic tool schemas registered after construction.
    tool_schemas: IndexMap<String, Value>,
    /// Generated delegate tool schemas, keyed by routing name.
    delegate_tools: IndexMap<String, Value>,
    /// Routing name to target agent id.
    delegate_map: IndexMap<String, String>,
    /// Built once at construction. Registering a tool later does not rewrite
    /// this text; dynamic schemas are merged at step time instead.
    system_message: String,
    total_tokens: TokenTotals,
    messages_handled: u64,
}

impl std::fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("tool_ids", &self.tool_ids)
            .field("messages_handled", &self.messages_handled)
            .finish_non_exhaustive()
    }
}

impl AgentRuntime {
    /// Build a runtime from a resolved spec and a backend handle. Fails if
    /// any delegate entry has no routing name: an unnamed delegate can never
    /// be reached, so a half-built runtime is refused outright.
    pub fn new(spec: AgentSpec, backend: Arc<dyn Backend>) -> Result<Self> {
        let tool_ids: Vec<String> = spec.tools.iter().cloned().collect();

        let mut delegate_tools = IndexMap::new();
        let mut delegate_map = IndexMap::new();
        for delegate in &spec.delegates {
            if delegate.name.is_empty() {
                return Err(Error::MissingDelegateName(delegate.id.clone()));
            }
            delegate_tools.insert(delegate.name.clone(), delegate_schema(delegate));
            delegate_map.insert(delegate.name.clone(), delegate.id.clone());
        }

        let system_message = build_system_message(&spec);

        Ok(Self {
            spec,
            backend,
            tool_ids,
            tool_schemas: IndexMap::new(),
            delegate_tools,
            delegate_map,
            system_message,
            total_tokens: TokenTotals::default(),
            messages_handled: 0,
        })
    }

    pub fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    /// Register (or replace) a dynamic tool schema. Chains.
    pub fn register_tool(&mut self, name: &str, schema: Value) -> Result<&mut Self> {
        if name.is_empty() {
            return Err(Error::MissingName);
        }
        if schema.is_null() {
            return Err(Error::MissingSchema(name.to_string()));
        }
        self.tool_schemas.insert(name.to_string(), schema);
        Ok(self)
    }

    /// One request/response exchange.
    ///
    /// A backend failure short-circuits the whole step and leaves counters
    /// and all runtime state untouched, so the instance stays consistent for
    /// a retry.
    pub async fn step(
        &mut self,
        source: &dyn MessageSource,
        stream: Option<UnboundedSender<StreamDelta>>,
        options: Option<StepOptions>,
    ) -> Result<StepResult> {
        let options = options.unwrap_or_default();

        // Delegate schemas are merged last and win on name collision.
        let mut tool_schemas = self.tool_schemas.clone();
        for (name, schema) in &self.delegate_tools {
            tool_schemas.insert(name.clone(), schema.clone());
        }

        let generate_options = GenerateOptions {
            model: self.spec.model.clone(),
            max_tokens: self.spec.max_tokens,
            temperature: self.spec.temperature,
            tools: (!self.tool_ids.is_empty()).then(|| self.tool_ids.clone()),
            thinking_effort: (self.spec.thinking_effort > 0).then_some(self.spec.thinking_effort),
            tool_call: options.tool_call,
            tool_schemas,
            stream,
        };

        // System message first. The cache hint is only safe when no dynamic
        // schemas could change the request prefix between steps.
        let mut messages = Vec::with_capacity(2);
        messages.push(Message::system(self.system_message.clone()));
        if self.tool_schemas.is_empty() {
            messages.push(Message::cache_marker(&self.spec.id));
        }
        messages.extend(source.get_messages());

        let completion = self.backend.generate(&messages, &generate_options).await?;

        let mut result = StepResult {
            result: completion.content.or(completion.result).unwrap_or_default(),
            tokens: completion.tokens,
            finish_reason: completion.finish_reason,
            meta: completion.meta,
            tool_calls: completion.tool_calls,
            ..StepResult::default()
        };

        if let Some(counts) = &result.tokens {
            self.total_tokens.add(counts);
            debug!(
                agent = %self.spec.id,
                total = self.total_tokens.total,
                "token totals updated"
            );
        }
        self.messages_handled += 1;

        // Delegate interception: the first call matching a routing name wins
        // and displaces every other tool call in the batch.
        if let Some(calls) = result.tool_calls.take() {
            let delegation = calls.iter().find_map(|call| {
                self.delegate_map.get(&call.name).map(|target| {
                    (
                        target.clone(),
                        call.str_arg("message").map(str::to_string),
                        call.name.clone(),
                    )
                })
            });
            match delegation {
                Some((target, message, name)) => {
                    debug!(agent = %self.spec.id, target = %target, tool = %name, "delegating");
                    result.delegate_target = Some(target);
                    result.delegate_message = message;
                    result.function_name = Some(name);
                }
                None => result.tool_calls = Some(calls),
            }
        }

        Ok(result)
    }

    pub fn get_stats(&self) -> RuntimeStats {
        RuntimeStats {
            id: self.spec.id.clone(),
            name: self.spec.name.clone(),
            messages_handled: self.messages_handled,
            total_tokens: self.total_tokens,
        }
    }
}

/// Tool schema generated for one delegate entry: a single required string
/// field `message` carrying the text handed to the target agent.
fn delegate_schema(delegate: &DelegateSpec) -> Value {
    let rule = if delegate.rule.is_empty() {
        "when appropriate"
    } else {
        delegate.rule.as_str()
    };
    json!({
        "name": delegate.name,
        "description": format!(
            "Forward the request to {}, this is exit tool, you can not call anything else with it.",
            rule
        ),
        "parameters": {
            "type": "object",
            "properties": {
                "message": {"type": "string"},
            },
            "required": ["message"],
        },
    })
}

/// Assemble the system message from a resolved spec. The prompt arrives
/// already trait-augmented by the resolver.
fn build_system_message(spec: &AgentSpec) -> String {
    let mut text = spec.prompt.clone();

    if !spec.name.is_empty() {
        text.push_str("\n\nYou are ");
        text.push_str(&spec.name);
        if !spec.description.is_empty() {
            text.push_str(", ");
            text.push_str(&spec.description);
        }
    }

    if !spec.memory.is_empty() {
        text.push_str("\n\n## Your memory contains:\n");
        for item in &spec.memory {
            text.push_str("- ");
            text.push_str(item);
            text.push('\n');
        }
    }

    if !spec.delegates.is_empty() {
        text.push_str("\n\n## You can delegate tasks to these specialized agents:\n");
        for delegate in &spec.delegates {
            let label = AgentSpec::delegate_label(&delegate.id);
            text.push_str(&format!(
                "- {}: {} (use tool {})\n",
                label, delegate.rule, delegate.name
            ));
        }
    }

    text
}
