//! Keyword memory — case-insensitive substring retrieval over the log.

use async_trait::async_trait;
use kangae_core::error::MemoryError;
use kangae_core::memory::Memory;
use kangae_core::message::{Message, Role};
use std::path::Path;

use crate::log::MessageLog;

/// A memory store whose `search` returns messages containing the query,
/// in log order.
#[derive(Default)]
pub struct ConversationMemory {
    log: MessageLog,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the stored messages, in order.
    pub async fn messages(&self) -> Vec<Message> {
        self.log.snapshot().await
    }

    pub async fn len(&self) -> usize {
        self.log.len().await
    }
}

#[async_trait]
impl Memory for ConversationMemory {
    async fn add(&self, role: Role, content: &str) -> Result<(), MemoryError> {
        self.log.push(Message::new(role, content)).await;
        Ok(())
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>, MemoryError> {
        let query_lower = query.to_lowercase();
        Ok(self
            .log
            .contents()
            .await
            .into_iter()
            .filter(|c| c.to_lowercase().contains(&query_lower))
            .take(top_k)
            .collect())
    }

    async fn save(&self, path: &Path) -> Result<(), MemoryError> {
        self.log.save(path).await
    }

    async fn load(&self, path: &Path) -> Result<(), MemoryError> {
        self.log.load(path).await
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.log.clear().await;
        Ok(())
    }
}
