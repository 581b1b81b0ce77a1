//! `kangae tools` — List the built-in tools.

use kangae_tools::default_registry;
use kangae_memory::ConversationMemory;
use std::sync::Arc;

pub fn run(schema: bool) -> Result<(), Box<dyn std::error::Error>> {
    // memory_search only exists with a store; an empty one is enough to list it.
    let registry = default_registry(Some(Arc::new(ConversationMemory::new())));

    println!("🔧 Built-in tools ({})", registry.len());
    println!("====================");
    for name in registry.names() {
        let Some(tool) = registry.get(name) else {
            continue;
        };
        println!("  {name:<15} {}", tool.description());
        println!("  {:<15} primary parameter: {}", "", tool.primary_parameter());
        if schema {
            let rendered = serde_json::to_string_pretty(&tool.parameters_schema())?;
            for line in rendered.lines() {
                println!("  {:<15} {line}", "");
            }
        }
    }
    println!();
    println!("  Call syntax in ReAct:  行動: <tool>: <json object or plain text>");

    Ok(())
}
