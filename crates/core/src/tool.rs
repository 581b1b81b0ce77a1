//! Tool traits, registry, and dispatcher.
//!
//! A tool is a named capability the ReAct loop can invoke by writing an
//! action line. Each tool declares a typed input struct; the dispatcher
//! validates the raw argument map into that struct before the handler runs,
//! so handlers never see malformed input.
//!
//! Dispatch never fails on the caller's mistakes: an unknown name or bad
//! arguments come back as literal text the model can read and correct on
//! its next turn. Only a failing handler yields an `Err`, which the loop
//! turns into observation text as well.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::{ToolError, ValidationError};

/// Raw, unvalidated tool arguments as a JSON object.
pub type ToolArguments = serde_json::Map<String, Value>;

/// Text returned for an action naming no registered tool.
pub const UNKNOWN_TOOL: &str = "Unknown tool";

/// Text prefix returned when arguments fail validation.
pub const INVALID_ARGUMENTS: &str = "Invalid arguments for";

/// A typed tool input, validated from a raw argument map.
///
/// Structural validation (field presence and types) comes from `serde`;
/// override [`ToolInput::check`] for constraints serde cannot express.
pub trait ToolInput: DeserializeOwned + Send + Sized {
    /// Semantic checks run after deserialization.
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Validate a raw argument map into the typed input.
    fn validate(arguments: &ToolArguments) -> Result<Self, ValidationError> {
        let input: Self = serde_json::from_value(Value::Object(arguments.clone()))
            .map_err(|e| ValidationError(e.to_string()))?;
        input.check()?;
        Ok(input)
    }
}

/// The core Tool trait.
///
/// Each built-in tool (calculator, memory_search, ...) implements this
/// trait and is registered in a [`ToolRegistry`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The validated argument struct handed to [`Tool::call`].
    type Input: ToolInput;

    /// The unique name of this tool (e.g., "calculator").
    fn name(&self) -> &str;

    /// A one-line description shown to the model.
    fn description(&self) -> &str;

    /// The parameter that receives the action text when the model writes a
    /// bare argument instead of a JSON object.
    fn primary_parameter(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with validated input.
    async fn call(&self, input: Self::Input) -> Result<String, ToolError>;
}

/// Why an erased invocation did not produce output.
#[derive(Debug)]
pub enum InvokeError {
    InvalidArguments(ValidationError),
    Failed(ToolError),
}

/// Object-safe view of a [`Tool`], as stored in the registry.
#[async_trait]
pub trait DynTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn primary_parameter(&self) -> &str;
    fn parameters_schema(&self) -> Value;

    /// Validate `arguments`, then run the handler.
    async fn invoke(&self, arguments: &ToolArguments) -> Result<String, InvokeError>;
}

#[async_trait]
impl<T: Tool> DynTool for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn description(&self) -> &str {
        Tool::description(self)
    }

    fn primary_parameter(&self) -> &str {
        Tool::primary_parameter(self)
    }

    fn parameters_schema(&self) -> Value {
        Tool::parameters_schema(self)
    }

    async fn invoke(&self, arguments: &ToolArguments) -> Result<String, InvokeError> {
        let input = T::Input::validate(arguments).map_err(InvokeError::InvalidArguments)?;
        self.call(input).await.map_err(InvokeError::Failed)
    }
}

/// A registry of available tools, keyed by unique name.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn DynTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = Tool::name(&tool).to_string();
        if self.tools.insert(name.clone(), Box::new(tool)).is_some() {
            warn!(tool = %name, "Replaced previously registered tool");
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn DynTool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Render one `- name: description` line per tool, sorted by name.
    pub fn describe(&self) -> String {
        self.names()
            .into_iter()
            .filter_map(|name| self.get(name))
            .map(|t| format!("- {}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the argument map for an action.
///
/// The raw text is tried as a JSON object first; anything else (plain text,
/// a JSON scalar or array) becomes `{primary: raw}`.
pub fn parse_arguments(raw: &str, primary: &str) -> ToolArguments {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => {
            let mut map = ToolArguments::new();
            map.insert(primary.to_string(), Value::String(raw.to_string()));
            map
        }
    }
}

/// Dispatch a call by name.
///
/// Unknown names and invalid arguments return literal text. Handler
/// failures are returned as `Err` for the caller to surface.
pub async fn dispatch(
    name: &str,
    arguments: &ToolArguments,
    registry: &ToolRegistry,
) -> Result<String, ToolError> {
    let Some(tool) = registry.get(name) else {
        debug!(tool = %name, "Dispatch to unregistered tool");
        return Ok(format!("{UNKNOWN_TOOL}: {name}"));
    };

    match tool.invoke(arguments).await {
        Ok(output) => Ok(output),
        Err(InvokeError::InvalidArguments(e)) => {
            debug!(tool = %name, error = %e, "Tool arguments rejected");
            Ok(format!("{INVALID_ARGUMENTS} {name}: {e}"))
        }
        Err(InvokeError::Failed(e)) => Err(e),
    }
}
