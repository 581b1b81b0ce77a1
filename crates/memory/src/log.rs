//! The ordered message log shared by every memory store, with JSON
//! persistence.
//!
//! File format:
//!
//! ```json
//! {
//!   "messages": [
//!     { "role": "user", "content": "質問" },
//!     { "role": "assistant", "content": "最終的な答え: ..." }
//!   ]
//! }
//! ```
//!
//! Writes go through a single `RwLock`, so each append is atomic even when
//! several runs share one store.

use kangae_core::error::MemoryError;
use kangae_core::message::Message;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct LogFile {
    #[serde(default)]
    messages: Vec<Message>,
}

/// An append-only, ordered list of messages.
#[derive(Default)]
pub struct MessageLog {
    messages: RwLock<Vec<Message>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: RwLock::new(messages),
        }
    }

    pub async fn push(&self, message: Message) {
        self.messages.write().await.push(message);
    }

    /// A copy of the log in insertion order.
    pub async fn snapshot(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }

    /// The contents of every message, in order.
    pub async fn contents(&self) -> Vec<String> {
        self.messages
            .read()
            .await
            .iter()
            .map(|m| m.content.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.messages.write().await.clear();
    }

    /// Write the log as pretty-printed JSON, creating parent directories.
    pub async fn save(&self, path: &Path) -> Result<(), MemoryError> {
        let messages = self.messages.read().await;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }

        let file = LogFile {
            messages: messages.clone(),
        };
        let content = serde_json::to_string_pretty(&file)
            .map_err(|e| MemoryError::Storage(format!("Failed to serialize messages: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| MemoryError::Storage(format!("Failed to write memory file: {e}")))?;

        debug!(path = %path.display(), count = messages.len(), "Memory saved");
        Ok(())
    }

    /// Replace the log with the contents of `path`.
    pub async fn load(&self, path: &Path) -> Result<(), MemoryError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MemoryError::Storage(format!("Failed to read memory file: {e}")))?;
        let file: LogFile = serde_json::from_str(&content)
            .map_err(|e| MemoryError::Corrupted(format!("{}: {e}", path.display())))?;

        debug!(path = %path.display(), count = file.messages.len(), "Memory loaded");
        *self.messages.write().await = file.messages;
        Ok(())
    }
}
