//! Agent spec resolution
//!
//! The central graph algorithm: flatten a root agent node and everything it
//! inherits into one self-contained `AgentSpec`. Three passes:
//!
//! 1. Depth-first inheritance merge (self before parents, parents in
//!    declaration order), with a shared visited set as the cycle guard.
//! 2. Trait composition: prompts appended in trait-list order, declared
//!    trait tools unioned in.
//! 3. Tool wildcard expansion, exactly once, as the final step.
//!
//! The resolver performs no writes and keeps no state between calls; the
//! visited set lives only for the duration of one resolution.

use crate::error::{Error, Result};
use crate::registry::{Node, Query, Registry, KIND_ENTRY, TYPE_AGENT};
use crate::resolver::spec::{AgentSpec, DelegateSpec};
use crate::resolver::traits::{str_field, string_seq, TraitCatalog};
use crate::resolver::wildcard::expand_tool_wildcards;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};

pub struct AgentResolver<'a> {
    registry: &'a dyn Registry,
}

impl<'a> AgentResolver<'a> {
    pub fn new(registry: &'a dyn Registry) -> Self {
        Self { registry }
    }

    /// Resolve the agent node at `id` into a flattened spec.
    pub async fn get_by_id(&self, id: &str) -> Result<AgentSpec> {
        if id.is_empty() {
            return Err(Error::MissingArgument("id"));
        }
        let node = self
            .registry
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No agent found with id '{}'", id)))?;
        self.resolve(&node).await
    }

    /// Resolve an agent by display name. Multiple matches resolve to the
    /// first in registry-supplied order.
    pub async fn get_by_name(&self, name: &str) -> Result<AgentSpec> {
        if name.is_empty() {
            return Err(Error::MissingArgument("name"));
        }
        let query = Query::new()
            .with_kind(KIND_ENTRY)
            .with_meta_type(TYPE_AGENT)
            .with_meta_name(name);
        let nodes = self.registry.find(&query).await?;
        let node = nodes
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("No agent found with name '{}'", name)))?;
        self.resolve(&node).await
    }

    /// Resolve a node already in hand. Fresh spec on every call; nothing is
    /// cached.
    pub async fn resolve(&self, node: &Node) -> Result<AgentSpec> {
        let mut visited = HashSet::new();
        let mut spec = self.merge_inherited(node, &mut visited).await?;
        self.apply_traits(&mut spec).await?;
        let tools = expand_tool_wildcards(self.registry, &spec.tools).await?;
        spec.tools = tools;
        debug!(
            agent = %spec.id,
            traits = spec.traits.len(),
            tools = spec.tools.len(),
            "resolved agent spec"
        );
        Ok(spec)
    }

    /// Depth-first inheritance merge. The visited set is shared across the
    /// whole call tree, so every reachable node is expanded at most once and
    /// cyclic graphs (including self-inheritance) terminate after a single
    /// traversal. Merging preserves first-occurrence order: existing entries
    /// keep their position, new entries append in the parent's order.
    fn merge_inherited<'b>(
        &'b self,
        node: &'b Node,
        visited: &'b mut HashSet<String>,
    ) -> Pin<Box<dyn Future<Output = Result<AgentSpec>> + Send + 'b>> {
        Box::pin(async move {
            if node.meta.type_tag != TYPE_AGENT {
                return Err(Error::WrongType {
                    id: node.id.clone(),
                    expected: TYPE_AGENT,
                    actual: node.meta.type_tag.clone(),
                });
            }

            let mut spec = project_node(node);
            visited.insert(node.id.clone());

            for parent_id in string_seq(node.data.get("inherit")) {
                // Cycle guard: an id already expanded anywhere in this
                // resolution is skipped, not an error.
                if visited.contains(&parent_id) {
                    continue;
                }
                let parent = match self.registry.get(&parent_id).await? {
                    Some(parent) => parent,
                    None => {
                        warn!(parent = %parent_id, "inherited agent not found, skipping");
                        continue;
                    }
                };
                if parent.meta.type_tag != TYPE_AGENT {
                    warn!(parent = %parent_id, "inherited node is not an agent, skipping");
                    continue;
                }
                let merged = self.merge_inherited(&parent, &mut *visited).await?;
                spec.traits.extend(merged.traits);
                spec.tools.extend(merged.tools);
                spec.memory.extend(merged.memory);
            }

            // Delegates are the node's own routing table; parents do not
            // contribute entries. serde_json keeps object keys sorted, so
            // iteration is deterministic.
            if let Some(map) = node.data.get("delegate").and_then(|v| v.as_object()) {
                for (target_id, entry) in map {
                    spec.delegates.push(DelegateSpec {
                        id: target_id.clone(),
                        name: str_field(entry, "name"),
                        rule: str_field(entry, "rule"),
                    });
                }
            }

            Ok(spec)
        })
    }

    /// Trait composition over the final merged trait list: look each
    /// reference up by name first, then by id; collect non-empty prompts and
    /// union declared tools. References that resolve to nothing contribute
    /// nothing.
    async fn apply_traits(&self, spec: &mut AgentSpec) -> Result<()> {
        let catalog = TraitCatalog::new(self.registry);
        let trait_refs: Vec<String> = spec.traits.iter().cloned().collect();

        for trait_ref in trait_refs {
            let record = match catalog.get_by_name(&trait_ref).await {
                Ok(record) => record,
                Err(_) => match catalog.get_by_id(&trait_ref).await {
                    Ok(record) => record,
                    Err(_) => {
                        debug!(trait_ref = %trait_ref, "trait reference did not resolve, skipping");
                        continue;
                    }
                },
            };
            if !record.prompt.is_empty() {
                spec.trait_prompts.push(record.prompt);
            }
            spec.tools.extend(record.tools);
        }

        if !spec.trait_prompts.is_empty() {
            let joined = spec.trait_prompts.join("\n\n");
            spec.prompt = if spec.prompt.is_empty() {
                joined
            } else {
                format!("{}\n\n{}", spec.prompt, joined)
            };
        }
        Ok(())
    }
}

/// Project an agent node's own fields into a fresh spec. Scalars default to
/// zero values; collections are seeded deduplicated from the payload.
fn project_node(node: &Node) -> AgentSpec {
    let data = &node.data;
    let mut spec = AgentSpec {
        id: node.id.clone(),
        name: node.meta.name.clone(),
        title: str_field(data, "title"),
        description: node.meta.comment.clone(),
        prompt: str_field(data, "prompt"),
        model: str_field(data, "model"),
        max_tokens: data.get("max_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        temperature: data
            .get("temperature")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0) as f32,
        thinking_effort: data
            .get("thinking_effort")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
        ..AgentSpec::default()
    };
    spec.traits.extend(string_seq(data.get("traits")));
    spec.tools.extend(string_seq(data.get("tools")));
    spec.memory.extend(string_seq(data.get("memory")));
    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{MemoryRegistry, TYPE_TOOL, TYPE_TRAIT};
    use serde_json::{json, Value};

    fn agent_node(id: &str, name: &str, data: Value) -> Node {
        Node::new(id, KIND_ENTRY)
            .with_type(TYPE_AGENT)
            .with_name(name)
            .with_data(data)
    }

    fn trait_node(id: &str, name: &str, data: Value) -> Node {
        Node::new(id, KIND_ENTRY)
            .with_type(TYPE_TRAIT)
            .with_name(name)
            .with_data(data)
    }

    fn tool_node(id: &str) -> Node {
        Node::new(id, KIND_ENTRY).with_type(TYPE_TOOL)
    }

    #[tokio::test]
    async fn test_resolve_projects_own_fields() {
        let mut registry = MemoryRegistry::new();
        registry.insert(
            agent_node("core:helper", "helper", json!({
                "title": "Helper",
                "prompt": "Assist the user.",
                "model": "sonnet-large",
                "max_tokens": 4096,
                "temperature": 0.3,
                "thinking_effort": 2,
                "tools": ["fs:read", "fs:read"],
                "memory": ["notes:today"],
            }))
            .with_comment("a general helper"),
        );

        let resolver = AgentResolver::new(&registry);
        let spec = resolver.get_by_id("core:helper").await.unwrap();
        assert_eq!(spec.id, "core:helper");
        assert_eq!(spec.name, "helper");
        assert_eq!(spec.title, "Helper");
        assert_eq!(spec.description, "a general helper");
        assert_eq!(spec.model, "sonnet-large");
        assert_eq!(spec.max_tokens, 4096);
        assert_eq!(spec.thinking_effort, 2);
        // Duplicate declarations dedupe in place.
        assert_eq!(spec.tools.len(), 1);
    }

    #[tokio::test]
    async fn test_self_inheritance_terminates() {
        let mut registry = MemoryRegistry::new();
        registry.insert(agent_node("loop:me", "me", json!({
            "inherit": ["loop:me"],
            "tools": ["fs:read"],
        })));

        let resolver = AgentResolver::new(&registry);
        let spec = resolver.get_by_id("loop:me").await.unwrap();
        assert_eq!(spec.tools.len(), 1);
    }

    #[tokio::test]
    async fn test_multi_node_cycle_terminates() {
        let mut registry = MemoryRegistry::new();
        registry.insert(agent_node("c:a", "a", json!({
            "inherit": ["c:b"],
            "tools": ["tool:a"],
        })));
        registry.insert(agent_node("c:b", "b", json!({
            "inherit": ["c:c"],
            "tools": ["tool:b"],
        })));
        registry.insert(agent_node("c:c", "c", json!({
            "inherit": ["c:a"],
            "tools": ["tool:c"],
        })));

        let resolver = AgentResolver::new(&registry);
        let spec = resolver.get_by_id("c:a").await.unwrap();
        let tools: Vec<_> = spec.tools.iter().map(String::as_str).collect();
        assert_eq!(tools, vec!["tool:a", "tool:b", "tool:c"]);
    }

    #[tokio::test]
    async fn test_union_keeps_first_occurrence_position() {
        let mut registry = MemoryRegistry::new();
        registry.insert(agent_node("u:child", "child", json!({
            "inherit": ["u:parent"],
            "tools": ["tool:x", "tool:own"],
        })));
        registry.insert(agent_node("u:parent", "parent", json!({
            "tools": ["tool:parent", "tool:x"],
        })));

        let resolver = AgentResolver::new(&registry);
        let spec = resolver.get_by_id("u:child").await.unwrap();
        let tools: Vec<_> = spec.tools.iter().map(String::as_str).collect();
        // tool:x stays at the child's declared position.
        assert_eq!(tools, vec!["tool:x", "tool:own", "tool:parent"]);
    }

    #[tokio::test]
    async fn test_parents_merge_in_declaration_order() {
        let mut registry = MemoryRegistry::new();
        registry.insert(agent_node("m:child", "child", json!({
            "inherit": ["m:second", "m:first"],
        })));
        registry.insert(agent_node("m:first", "first", json!({
            "memory": ["mem:first"],
        })));
        registry.insert(agent_node("m:second", "second", json!({
            "memory": ["mem:second"],
        })));

        let resolver = AgentResolver::new(&registry);
        let spec = resolver.get_by_id("m:child").await.unwrap();
        let memory: Vec<_> = spec.memory.iter().map(String::as_str).collect();
        assert_eq!(memory, vec!["mem:second", "mem:first"]);
    }

    #[tokio::test]
    async fn test_missing_parent_is_skipped() {
        let mut registry = MemoryRegistry::new();
        registry.insert(agent_node("s:child", "child", json!({
            "inherit": ["s:ghost"],
            "tools": ["tool:own"],
        })));

        let resolver = AgentResolver::new(&registry);
        let spec = resolver.get_by_id("s:child").await.unwrap();
        assert_eq!(spec.tools.len(), 1);
    }

    #[tokio::test]
    async fn test_non_agent_parent_is_skipped() {
        let mut registry = MemoryRegistry::new();
        registry.insert(agent_node("s:child", "child", json!({
            "inherit": ["s:trait"],
        })));
        registry.insert(trait_node("s:trait", "trait", json!({"tools": ["tool:trait"]})));

        let resolver = AgentResolver::new(&registry);
        let spec = resolver.get_by_id("s:child").await.unwrap();
        assert!(spec.tools.is_empty());
    }

    #[tokio::test]
    async fn test_trait_prompts_append_in_trait_order() {
        let mut registry = MemoryRegistry::new();
        registry.insert(agent_node("p:agent", "agent", json!({
            "prompt": "B",
            "traits": ["t1", "t2"],
        })));
        registry.insert(trait_node("t:one", "t1", json!({"prompt": "T1"})));
        registry.insert(trait_node("t:two", "t2", json!({"prompt": "T2"})));

        let resolver = AgentResolver::new(&registry);
        let spec = resolver.get_by_id("p:agent").await.unwrap();
        assert_eq!(spec.prompt, "B\n\nT1\n\nT2");
        assert_eq!(spec.trait_prompts, vec!["T1", "T2"]);
    }

    #[tokio::test]
    async fn test_trait_prompts_without_base_prompt() {
        let mut registry = MemoryRegistry::new();
        registry.insert(agent_node("p:agent", "agent", json!({
            "traits": ["t1", "t2"],
        })));
        registry.insert(trait_node("t:one", "t1", json!({"prompt": "T1"})));
        registry.insert(trait_node("t:two", "t2", json!({"prompt": "T2"})));

        let resolver = AgentResolver::new(&registry);
        let spec = resolver.get_by_id("p:agent").await.unwrap();
        // No leading separator when the agent declares no prompt of its own.
        assert_eq!(spec.prompt, "T1\n\nT2");
    }

    #[tokio::test]
    async fn test_trait_lookup_falls_back_to_id() {
        let mut registry = MemoryRegistry::new();
        registry.insert(agent_node("p:agent", "agent", json!({
            "prompt": "B",
            "traits": ["t:by_id"],
        })));
        registry.insert(trait_node("t:by_id", "some other name", json!({"prompt": "T"})));

        let resolver = AgentResolver::new(&registry);
        let spec = resolver.get_by_id("p:agent").await.unwrap();
        assert_eq!(spec.prompt, "B\n\nT");
    }

    #[tokio::test]
    async fn test_unresolvable_trait_is_skipped_silently() {
        let mut registry = MemoryRegistry::new();
        registry.insert(agent_node("p:agent", "agent", json!({
            "prompt": "B",
            "traits": ["ghost"],
        })));

        let resolver = AgentResolver::new(&registry);
        let spec = resolver.get_by_id("p:agent").await.unwrap();
        assert_eq!(spec.prompt, "B");
        assert!(spec.trait_prompts.is_empty());
        // The unresolved reference still appears in the trait list.
        assert!(spec.traits.contains("ghost"));
    }

    #[tokio::test]
    async fn test_trait_tools_union_into_spec() {
        let mut registry = MemoryRegistry::new();
        registry.insert(agent_node("p:agent", "agent", json!({
            "tools": ["tool:own"],
            "traits": ["editor"],
        })));
        registry.insert(trait_node("t:editor", "editor", json!({
            "prompt": "Edit carefully.",
            "tools": ["tool:edit", "tool:own"],
        })));

        let resolver = AgentResolver::new(&registry);
        let spec = resolver.get_by_id("p:agent").await.unwrap();
        let tools: Vec<_> = spec.tools.iter().map(String::as_str).collect();
        assert_eq!(tools, vec!["tool:own", "tool:edit"]);
    }

    #[tokio::test]
    async fn test_wildcards_resolved_in_final_tools() {
        let mut registry = MemoryRegistry::new();
        registry.insert(agent_node("w:agent", "agent", json!({
            "tools": ["fs:*", "web:fetch"],
        })));
        registry.insert(tool_node("fs:read"));
        registry.insert(tool_node("fs:write"));

        let resolver = AgentResolver::new(&registry);
        let spec = resolver.get_by_id("w:agent").await.unwrap();
        let tools: Vec<_> = spec.tools.iter().map(String::as_str).collect();
        assert_eq!(tools, vec!["fs:read", "fs:write", "web:fetch"]);

        // Resolving again against the unchanged registry is identical.
        let again = resolver.get_by_id("w:agent").await.unwrap();
        assert_eq!(spec, again);
    }

    #[tokio::test]
    async fn test_delegates_projected_from_own_node_only() {
        let mut registry = MemoryRegistry::new();
        registry.insert(agent_node("d:child", "child", json!({
            "inherit": ["d:parent"],
            "delegate": {
                "support:triage": {"name": "route_triage", "rule": "for support tickets"},
            },
        })));
        registry.insert(agent_node("d:parent", "parent", json!({
            "delegate": {
                "ops:oncall": {"name": "route_oncall", "rule": "for incidents"},
            },
        })));

        let resolver = AgentResolver::new(&registry);
        let spec = resolver.get_by_id("d:child").await.unwrap();
        assert_eq!(spec.delegates.len(), 1);
        assert_eq!(spec.delegates[0].id, "support:triage");
        assert_eq!(spec.delegates[0].name, "route_triage");
        assert_eq!(spec.delegates[0].rule, "for support tickets");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let registry = MemoryRegistry::new();
        let resolver = AgentResolver::new(&registry);
        let err = resolver.get_by_id("ghost:agent").await.unwrap_err();
        assert_eq!(err.to_string(), "No agent found with id 'ghost:agent'");
    }

    #[tokio::test]
    async fn test_get_by_name_not_found() {
        let registry = MemoryRegistry::new();
        let resolver = AgentResolver::new(&registry);
        let err = resolver.get_by_name("ghost").await.unwrap_err();
        assert_eq!(err.to_string(), "No agent found with name 'ghost'");
    }

    #[tokio::test]
    async fn test_resolve_rejects_non_agent_node() {
        let mut registry = MemoryRegistry::new();
        registry.insert(trait_node("t:x", "x", Value::Null));

        let resolver = AgentResolver::new(&registry);
        let err = resolver.get_by_id("t:x").await.unwrap_err();
        assert!(matches!(err, Error::WrongType { .. }));
    }

    #[tokio::test]
    async fn test_get_by_name_resolves_first_match() {
        let mut registry = MemoryRegistry::new();
        registry.insert(agent_node("a:dup", "dup", json!({"prompt": "first"})));
        registry.insert(agent_node("b:dup", "dup", json!({"prompt": "second"})));

        let resolver = AgentResolver::new(&registry);
        let spec = resolver.get_by_name("dup").await.unwrap();
        assert_eq!(spec.id, "a:dup");
    }
}
