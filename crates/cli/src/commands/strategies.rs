//! `kangae strategies` — List the reasoning strategies.

use kangae_agent::Strategy;
use kangae_config::AppConfig;

pub fn run(config: &AppConfig) {
    println!("🧭 Strategies");
    println!("=============");
    for strategy in Strategy::ALL {
        let marker = if strategy.name() == config.agent.strategy { "*" } else { " " };
        println!("  {marker} {:<6} {}", strategy.name(), strategy.description());
    }
    println!();

    let (depth, breadth) = config.tot.resolved();
    println!("  max_turns = {}", config.agent.max_turns);
    println!("  tot depth = {depth}, breadth = {breadth}");
}
