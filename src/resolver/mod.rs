//! Spec resolution
//!
//! Turns graph-stored agent definitions into flattened `AgentSpec`s:
//! - `TraitCatalog`: read-only trait lookups
//! - `expand_tool_wildcards`: namespace wildcard expansion
//! - `AgentResolver`: inheritance merge, trait composition, wildcard pass

mod agent;
mod spec;
mod traits;
mod wildcard;

pub use agent::AgentResolver;
pub use spec::{AgentSpec, DelegateSpec};
pub use traits::{TraitCatalog, TraitRecord};
pub use wildcard::expand_tool_wildcards;
