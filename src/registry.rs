//! Registry collaborator boundary
//!
//! The engine consumes an external graph store of typed nodes through two
//! calls: `get(id)` and `find(query)`. Storage, indexing, and collation are
//! the registry's concern. The engine only validates the `meta.type`
//! discriminator of whatever comes back, never silently coercing a node of
//! the wrong type.

use crate::error::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Node kind for standard registry entries.
pub const KIND_ENTRY: &str = "entry";
/// `meta.type` tag for agent nodes.
pub const TYPE_AGENT: &str = "agent";
/// `meta.type` tag for trait nodes.
pub const TYPE_TRAIT: &str = "agent.trait";
/// `meta.type` tag for tool nodes.
pub const TYPE_TOOL: &str = "tool";

/// A node in the registry graph.
///
/// Identifiers are globally unique and colon-namespaced ("ns:name"). The
/// `data` payload is type-specific and stays untyped until a component
/// projects it into a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub meta: NodeMeta,
    #[serde(default)]
    pub data: Value,
}

/// Common metadata block shared by all node types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMeta {
    /// Type discriminator, e.g. `"agent"` or `"agent.trait"`.
    #[serde(rename = "type", default)]
    pub type_tag: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Free-text comment, used as the description of derived records.
    #[serde(default)]
    pub comment: String,
    /// Optional class tags.
    #[serde(default)]
    pub class: Vec<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            meta: NodeMeta::default(),
            data: Value::Null,
        }
    }

    /// Namespace prefix of the id (text before the first colon).
    pub fn namespace(&self) -> &str {
        self.id.split(':').next().unwrap_or_default()
    }

    /// Builder: set the `meta.type` discriminator.
    pub fn with_type(mut self, type_tag: impl Into<String>) -> Self {
        self.meta.type_tag = type_tag.into();
        self
    }

    /// Builder: set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.meta.name = name.into();
        self
    }

    /// Builder: set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.meta.comment = comment.into();
        self
    }

    /// Builder: set the type-specific payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Attribute query against the registry.
///
/// Serializes to the registry's query keys: `.kind`, `.ns` (namespace-prefix
/// match), `meta.type`, `meta.name`. Keys this engine does not set are the
/// registry's concern and are not validated here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(rename = ".kind", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = ".ns", default, skip_serializing_if = "Option::is_none")]
    pub ns: Option<String>,
    #[serde(rename = "meta.type", default, skip_serializing_if = "Option::is_none")]
    pub meta_type: Option<String>,
    #[serde(rename = "meta.name", default, skip_serializing_if = "Option::is_none")]
    pub meta_name: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_ns(mut self, ns: impl Into<String>) -> Self {
        self.ns = Some(ns.into());
        self
    }

    pub fn with_meta_type(mut self, meta_type: impl Into<String>) -> Self {
        self.meta_type = Some(meta_type.into());
        self
    }

    pub fn with_meta_name(mut self, meta_name: impl Into<String>) -> Self {
        self.meta_name = Some(meta_name.into());
        self
    }
}

/// Read contract for the external graph store.
///
/// Concurrent reads are safe; the engine performs no writes through this
/// trait and holds no handle beyond what the caller gave it.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetch a node by exact id. `Ok(None)` when no node exists there.
    async fn get(&self, id: &str) -> Result<Option<Node>>;

    /// Query nodes by attribute predicate, in registry-supplied order.
    async fn find(&self, query: &Query) -> Result<Vec<Node>>;
}

/// In-memory registry backed by an insertion-ordered map.
///
/// "Registry-supplied order" here is insertion order, which keeps name
/// lookups and `find` results deterministic. Used by tests and available to
/// embedders that load node sets up front.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    nodes: IndexMap<String, Node>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node, keyed by its id.
    pub fn insert(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn get(&self, id: &str) -> Result<Option<Node>> {
        Ok(self.nodes.get(id).cloned())
    }

    async fn find(&self, query: &Query) -> Result<Vec<Node>> {
        let matches = self
            .nodes
            .values()
            .filter(|node| {
                query.kind.as_deref().map_or(true, |k| node.kind == k)
                    && query.ns.as_deref().map_or(true, |ns| node.namespace() == ns)
                    && query
                        .meta_type
                        .as_deref()
                        .map_or(true, |t| node.meta.type_tag == t)
                    && query
                        .meta_name
                        .as_deref()
                        .map_or(true, |n| node.meta.name == n)
            })
            .cloned()
            .collect();
        Ok(matches)
    }
}
