//! Memory trait — an ordered, role-tagged message log with retrieval.
//!
//! Loops borrow a memory store for the duration of a run: they read from it
//! to prime the scratchpad and append every question, model output, and
//! observation. Implementations serialize concurrent `add`/`search` calls
//! internally; each append is atomic, but the interleaving of appends from
//! concurrent runs is unspecified.
//!
//! Implementations: keyword store and TF-IDF similarity store (see
//! `kangae-memory`).

use async_trait::async_trait;
use std::path::Path;

use crate::error::MemoryError;
use crate::message::Role;

/// The core Memory trait.
#[async_trait]
pub trait Memory: Send + Sync {
    /// Append a message to the log.
    async fn add(&self, role: Role, content: &str) -> Result<(), MemoryError>;

    /// Return up to `top_k` message contents, most relevant first.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>, MemoryError>;

    /// Persist the ordered log to a structured file.
    async fn save(&self, path: &Path) -> Result<(), MemoryError>;

    /// Replace the log with the one stored at `path`.
    async fn load(&self, path: &Path) -> Result<(), MemoryError>;

    /// Remove all messages.
    async fn clear(&self) -> Result<(), MemoryError>;
}
