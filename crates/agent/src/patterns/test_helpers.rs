//! Shared test helpers for pattern tests.

use async_trait::async_trait;
use kangae_core::error::{MemoryError, ModelError, ToolError, ValidationError};
use kangae_core::memory::Memory;
use kangae_core::message::Role;
use kangae_core::model::LanguageModel;
use kangae_core::tool::{Tool, ToolInput};
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A model that returns a sequence of scripted responses and records the
/// prompts it was given.
///
/// Panics if more calls are made than responses provided.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// The same response, `n` times.
    pub fn repeating(response: &str, n: usize) -> Arc<Self> {
        Self::new(&vec![response; n])
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let mut prompts = self.prompts.lock().unwrap();
        let response = self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            panic!(
                "ScriptedModel: no more responses (call #{})",
                prompts.len() + 1
            )
        });
        prompts.push(prompt.to_string());
        Ok(response)
    }
}

/// A model whose every call fails.
pub struct BrokenModel;

#[async_trait]
impl LanguageModel for BrokenModel {
    async fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
        Err(ModelError::Invocation("connection refused".into()))
    }
}

/// A memory store whose every operation fails.
pub struct BrokenMemory;

#[async_trait]
impl Memory for BrokenMemory {
    async fn add(&self, _role: Role, _content: &str) -> Result<(), MemoryError> {
        Err(MemoryError::Storage("disk full".into()))
    }

    async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<String>, MemoryError> {
        Err(MemoryError::QueryFailed("index offline".into()))
    }

    async fn save(&self, _path: &Path) -> Result<(), MemoryError> {
        Err(MemoryError::Storage("disk full".into()))
    }

    async fn load(&self, _path: &Path) -> Result<(), MemoryError> {
        Err(MemoryError::Storage("disk full".into()))
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        Err(MemoryError::Storage("disk full".into()))
    }
}

#[derive(Deserialize)]
#[serde(transparent)]
pub struct EchoInput(serde_json::Map<String, serde_json::Value>);

impl ToolInput for EchoInput {}

/// Returns its arguments unchanged, as compact JSON.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    type Input = EchoInput;

    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "入力をそのまま返す"
    }

    fn primary_parameter(&self) -> &str {
        "text"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object" })
    }

    async fn call(&self, input: EchoInput) -> Result<String, ToolError> {
        Ok(serde_json::Value::Object(input.0).to_string())
    }
}

#[derive(Deserialize)]
pub struct StrictInput {
    pub count: u32,
}

impl ToolInput for StrictInput {
    fn check(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError("count must be positive".into()));
        }
        Ok(())
    }
}

/// Fails on every call after validating its input.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    type Input = StrictInput;

    fn name(&self) -> &str {
        "fragile"
    }

    fn description(&self) -> &str {
        "常に失敗する"
    }

    fn primary_parameter(&self) -> &str {
        "count"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "count": { "type": "integer" } },
            "required": ["count"]
        })
    }

    async fn call(&self, _input: StrictInput) -> Result<String, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "fragile".into(),
            reason: "exploded".into(),
        })
    }
}
