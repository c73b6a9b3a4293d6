//! Namespace wildcard expansion for tool references
//!
//! A token like `"fs:*"` stands for every tool node in the `fs` namespace.
//! Expansion queries the registry once per wildcard token; concrete tokens
//! pass through verbatim with no I/O. The output keeps first-occurrence
//! order across the whole input sequence, expansions included.

use crate::error::Result;
use crate::registry::{Query, Registry, TYPE_TOOL};
use indexmap::IndexSet;
use tracing::debug;

/// Namespace of a wildcard token, or `None` for concrete tokens.
fn wildcard_namespace(token: &str) -> Option<&str> {
    token.strip_suffix(":*").filter(|ns| !ns.is_empty())
}

/// Expand wildcard tokens against the registry. An empty input yields an
/// empty output, never an error.
pub async fn expand_tool_wildcards<I>(
    registry: &dyn Registry,
    tokens: I,
) -> Result<IndexSet<String>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out = IndexSet::new();
    for token in tokens {
        let token = token.as_ref();
        if let Some(ns) = wildcard_namespace(token) {
            let query = Query::new().with_ns(ns).with_meta_type(TYPE_TOOL);
            let matches = registry.find(&query).await?;
            debug!(namespace = ns, count = matches.len(), "expanded tool wildcard");
            for node in matches {
                out.insert(node.id);
            }
        } else {
            out.insert(token.to_string());
        }
    }
    Ok(out)
}
