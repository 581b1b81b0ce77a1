//! Built-in tool implementations for Kangae.
//!
//! Tools give the ReAct loop something to act with: arithmetic that models
//! get wrong, and explicit lookups in the session's memory store.

pub mod calculator;
pub mod memory_search;

use kangae_core::memory::Memory;
use kangae_core::tool::ToolRegistry;
use std::sync::Arc;

pub use calculator::CalculatorTool;
pub use memory_search::MemorySearchTool;

/// Create a default tool registry with all built-in tools.
///
/// `memory_search` is only registered when a store is supplied.
pub fn default_registry(memory: Option<Arc<dyn Memory>>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(CalculatorTool);
    if let Some(memory) = memory {
        registry.register(MemorySearchTool::new(memory));
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use kangae_memory::ConversationMemory;

    #[test]
    fn registry_without_memory() {
        let registry = default_registry(None);
        assert_eq!(registry.names(), vec!["calculator"]);
    }

    #[test]
    fn registry_with_memory() {
        let registry = default_registry(Some(Arc::new(ConversationMemory::new())));
        assert_eq!(registry.names(), vec!["calculator", "memory_search"]);
        assert_eq!(registry.get("memory_search").unwrap().primary_parameter(), "query");
    }
}
