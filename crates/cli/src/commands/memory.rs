//! `kangae memory` — Inspect, search, or clear a saved memory file.

use kangae_config::{AppConfig, MemoryKind};
use kangae_core::message::Message;
use kangae_memory::MessageLog;
use std::path::{Path, PathBuf};

use super::chat::open_memory;

/// `--file` if given, otherwise `[memory] file`.
pub fn resolve_path(
    file: Option<PathBuf>,
    config: &AppConfig,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    file.or_else(|| config.memory.file.clone()).ok_or_else(|| {
        "No memory file given. Pass --file or set [memory] file / KANGAE_MEMORY_FILE".into()
    })
}

async fn read_log(path: &Path) -> Result<Vec<Message>, Box<dyn std::error::Error>> {
    let log = MessageLog::new();
    log.load(path).await?;
    Ok(log.snapshot().await)
}

fn preview(content: &str, max_chars: usize) -> String {
    let flat = content.replace('\n', " ⏎ ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}

pub async fn show(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        println!("🧠 No memory file at {}", path.display());
        return Ok(());
    }

    let messages = read_log(path).await?;
    println!("🧠 {} ({} messages)", path.display(), messages.len());
    println!("====================");
    for (i, message) in messages.iter().enumerate() {
        println!("  {:>3}. [{:<9}] {}", i + 1, message.role.as_str(), preview(&message.content, 100));
    }

    Ok(())
}

pub async fn search(
    path: &Path,
    query: &str,
    limit: usize,
    vector: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = if vector {
        MemoryKind::Vector
    } else {
        MemoryKind::Conversation
    };
    let memory = open_memory(kind);
    if path.exists() {
        memory.load(path).await?;
    }

    println!("🔍 Searching memories for: \"{query}\" ({kind})");
    println!();

    let results = memory.search(query, limit).await?;
    if results.is_empty() {
        println!("   No memories found.");
    } else {
        for (i, content) in results.iter().enumerate() {
            println!("  {:>2}. {}", i + 1, preview(content, 80));
        }
    }

    Ok(())
}

pub async fn clear(path: &Path, confirm: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !confirm {
        println!("⚠️  This will delete ALL messages in {}.", path.display());
        println!("   Run with --confirm to proceed:");
        println!("   kangae memory clear --confirm");
        return Ok(());
    }

    let memory = open_memory(MemoryKind::Conversation);
    memory.clear().await?;
    memory.save(path).await?;
    println!("🗑️  Cleared {}.", path.display());

    Ok(())
}
