//! Trait catalog
//!
//! Read-only lookup of trait nodes. A trait is a reusable fragment of
//! prompt text and tool references that agents attach by name or id; the
//! catalog projects registry nodes into immutable records and nothing more.

use crate::error::{Error, Result};
use crate::registry::{Node, Query, Registry, KIND_ENTRY, TYPE_TRAIT};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pure projection of a trait node, with defaults for absent fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub prompt: String,
    pub tools: Vec<String>,
}

impl TraitRecord {
    fn from_node(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            name: node.meta.name.clone(),
            description: node.meta.comment.clone(),
            prompt: str_field(&node.data, "prompt"),
            tools: string_seq(node.data.get("tools")),
        }
    }
}

/// String field from a node payload, empty when absent.
pub(crate) fn str_field(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// String sequence from a node payload field, empty when absent.
/// Non-string elements are dropped rather than coerced.
pub(crate) fn string_seq(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Lookup of trait records by id or display name.
pub struct TraitCatalog<'a> {
    registry: &'a dyn Registry,
}

impl<'a> TraitCatalog<'a> {
    pub fn new(registry: &'a dyn Registry) -> Self {
        Self { registry }
    }

    /// Look up a trait node by exact id.
    pub async fn get_by_id(&self, id: &str) -> Result<TraitRecord> {
        if id.is_empty() {
            return Err(Error::MissingArgument("id"));
        }
        let node = self
            .registry
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No trait found with id '{}'", id)))?;
        if node.meta.type_tag != TYPE_TRAIT {
            return Err(Error::WrongType {
                id: node.id,
                expected: TYPE_TRAIT,
                actual: node.meta.type_tag,
            });
        }
        Ok(TraitRecord::from_node(&node))
    }

    /// Look up a trait by display name. Multiple matches resolve to the
    /// first in registry-supplied order.
    pub async fn get_by_name(&self, name: &str) -> Result<TraitRecord> {
        if name.is_empty() {
            return Err(Error::MissingArgument("name"));
        }
        let query = Query::new()
            .with_kind(KIND_ENTRY)
            .with_meta_type(TYPE_TRAIT)
            .with_meta_name(name);
        let nodes = self.registry.find(&query).await?;
        let node = nodes
            .first()
            .ok_or_else(|| Error::NotFound(format!("No trait found with name '{}'", name)))?;
        Ok(TraitRecord::from_node(node))
    }

    /// Every trait node, in registry-supplied order. Empty registry means
    /// an empty list, never an error.
    pub async fn get_all(&self) -> Result<Vec<TraitRecord>> {
        let query = Query::new().with_kind(KIND_ENTRY).with_meta_type(TYPE_TRAIT);
        let nodes = self.registry.find(&query).await?;
        Ok(nodes.iter().map(TraitRecord::from_node).collect())
    }
}
