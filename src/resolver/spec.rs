//! Resolved agent specification
//!
//! The central artifact of resolution: a flattened, self-contained agent
//! configuration. Plain serializable data, rebuilt on every resolution call
//! and immutable once returned.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// One delegate routing entry: a tool call named `name` hands the
/// conversation to the agent at `id` when the model decides `rule` applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rule: String,
}

/// Fully resolved agent configuration: inheritance flattened, trait prompts
/// appended, tool wildcards expanded.
///
/// Invariants:
/// - `traits`, `tools`, `memory` hold no duplicates; order is the first
///   occurrence during the depth-first merge (self before parents, parents
///   in declaration order).
/// - `tools` never contains a wildcard token; expansion runs exactly once,
///   after the inheritance and trait merge.
/// - `prompt` is the declared prompt with each non-empty trait prompt
///   appended in trait-list order, blank-line separated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSpec {
    pub id: String,
    pub name: String,
    pub title: String,
    pub description: String,
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub thinking_effort: u32,
    pub traits: IndexSet<String>,
    pub tools: IndexSet<String>,
    pub memory: IndexSet<String>,
    pub delegates: Vec<DelegateSpec>,
    pub trait_prompts: Vec<String>,
}

impl AgentSpec {
    /// Display label for a delegate target id: the last colon-separated
    /// segment, underscores and hyphens as spaces, first letter upper-cased.
    /// "support:ticket_triage" becomes "Ticket triage".
    pub fn delegate_label(target_id: &str) -> String {
        let tail = target_id.rsplit(':').next().unwrap_or(target_id);
        let spaced = tail.replace(['_', '-'], " ");
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => spaced,
        }
    }
}
