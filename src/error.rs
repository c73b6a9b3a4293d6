//! Crate-wide error types
//!
//! Every fallible operation returns `Result<T, Error>`. Argument checks run
//! before any registry or backend I/O, so a `MissingArgument` never leaves a
//! half-finished query behind. Collaborator failures pass through as opaque
//! `Registry`/`Backend` variants.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A required parameter was empty or absent. Raised before any I/O.
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    /// No registry node matched the lookup. The message identifies the
    /// lookup kind ("No trait found...", "No agent found...").
    #[error("{0}")]
    NotFound(String),

    /// A node exists but its `meta.type` discriminator does not match the
    /// expected tag for the operation.
    #[error("node '{id}' has type '{actual}', expected '{expected}'")]
    WrongType {
        id: String,
        expected: &'static str,
        actual: String,
    },

    /// A delegate entry has no routing name. Fatal at runtime construction:
    /// an unnamed delegate can never be reached by a tool call.
    #[error("delegate for '{0}' has no routing name")]
    MissingDelegateName(String),

    /// `register_tool` was called without a tool name.
    #[error("missing tool name")]
    MissingName,

    /// `register_tool` was called without a schema.
    #[error("missing schema for tool '{0}'")]
    MissingSchema(String),

    /// Opaque registry failure, passed through unchanged.
    #[error("registry error: {0}")]
    Registry(String),

    /// Opaque backend failure, passed through unchanged.
    #[error("backend error: {0}")]
    Backend(String),
}
