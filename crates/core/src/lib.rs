//! # Kangae Core
//!
//! Domain types, traits, and error definitions for the Kangae reasoning-loop
//! engine. This crate has **no runtime dependencies** — it defines the model
//! that the memory, tool, and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of a reasoning loop is a trait here:
//! - [`LanguageModel`] — `(prompt) -> text`, one call per turn
//! - [`Evaluator`] — scores a Tree-of-Thoughts history
//! - [`Memory`] — ordered message log with retrieval
//! - [`Tool`] — named capabilities with typed, validated input
//!
//! The textual response protocol the loops speak lives in [`protocol`].

pub mod error;
pub mod memory;
pub mod message;
pub mod model;
pub mod protocol;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, ModelError, Result, ToolError, ValidationError};
pub use memory::Memory;
pub use message::{Message, Role};
pub use model::{Evaluator, LanguageModel};
pub use protocol::{Action, Intent};
pub use tool::{DynTool, Tool, ToolArguments, ToolInput, ToolRegistry, dispatch, parse_arguments};
