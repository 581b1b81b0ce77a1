//! Memory search tool — lets the agent look things up in its own memory.
//!
//! The reasoning loops already recall context automatically at the start of
//! a run; this tool lets the ReAct loop issue further, targeted lookups
//! mid-run through the same [`Memory::search`].

use async_trait::async_trait;
use kangae_core::error::{ToolError, ValidationError};
use kangae_core::memory::Memory;
use kangae_core::tool::{Tool, ToolInput};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const MAX_LIMIT: usize = 50;

fn default_limit() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct MemorySearchInput {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl ToolInput for MemorySearchInput {
    fn check(&self) -> Result<(), ValidationError> {
        if self.query.trim().is_empty() {
            return Err(ValidationError("query must not be empty".into()));
        }
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(ValidationError(format!(
                "limit must be between 1 and {MAX_LIMIT}, got {}",
                self.limit
            )));
        }
        Ok(())
    }
}

/// Searches the session's memory store.
pub struct MemorySearchTool {
    memory: Arc<dyn Memory>,
}

impl MemorySearchTool {
    pub fn new(memory: Arc<dyn Memory>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for MemorySearchTool {
    type Input = MemorySearchInput;

    fn name(&self) -> &str {
        "memory_search"
    }

    fn description(&self) -> &str {
        "過去の会話や記録を検索するツール。入力は検索語。"
    }

    fn primary_parameter(&self) -> &str {
        "query"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query to find relevant memories"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of memories to return (default 5)",
                    "minimum": 1,
                    "maximum": MAX_LIMIT,
                    "default": 5
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, input: MemorySearchInput) -> Result<String, ToolError> {
        let hits = self
            .memory
            .search(&input.query, input.limit)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "memory_search".into(),
                reason: e.to_string(),
            })?;

        debug!(query = %input.query, hits = hits.len(), "Memory search tool");

        if hits.is_empty() {
            return Ok(format!("No memories found matching '{}'.", input.query));
        }
        Ok(hits
            .iter()
            .enumerate()
            .map(|(i, hit)| format!("{}. {hit}", i + 1))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
