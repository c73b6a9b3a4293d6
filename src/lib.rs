//! Agentloom - declarative agent resolution and runtime
//!
//! This crate provides:
//! - A resolver that flattens graph-stored agent definitions (multi-parent
//!   inheritance, traits, tool wildcards) into self-contained specs
//! - A runtime that drives single request/response exchanges against a
//!   model backend, with delegate interception and token accounting
//!
//! The registry, the model backend, and conversation history are external
//! collaborators, consumed through the `Registry`, `Backend`, and
//! `MessageSource` traits.

pub mod backend;
pub mod error;
pub mod message;
pub mod registry;
pub mod runtime;

// Resolution engine
pub mod resolver;

pub use backend::{Backend, Completion, GenerateOptions, StreamDelta, TokenCounts, ToolCall};
pub use error::{Error, Result};
pub use message::{Content, ContentPart, Message, MessageSource, Role};
pub use registry::{MemoryRegistry, Node, NodeMeta, Query, Registry};
pub use resolver::{expand_tool_wildcards, AgentResolver, AgentSpec, DelegateSpec, TraitCatalog, TraitRecord};
pub use runtime::{AgentRuntime, RuntimeStats, StepOptions, StepResult, TokenTotals};
