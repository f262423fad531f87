//! CLI `memories list` command: print stored memories.

use anyhow::Result;

use smala::config::SmalaConfig;
use smala::memory::types::Memory;

/// List memories in insertion order. Inactive ones only with `all`.
pub fn list(config: &SmalaConfig, all: bool, json: bool) -> Result<()> {
    let store = super::open_store(config)?;

    let memories: Vec<&Memory> = if all {
        store.memories().iter().collect()
    } else {
        store.get_active_memories()
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&memories)?);
        return Ok(());
    }

    if memories.is_empty() {
        println!("No memories stored in {}.", store.path().display());
        return Ok(());
    }

    println!(
        "{:<4} {:<22} {:<8} {:<8} {}",
        "#", "Category", "Priority", "Active", "Created"
    );
    println!("{}", "-".repeat(70));
    for (i, m) in memories.iter().enumerate() {
        println!(
            "{:<4} {:<22} {:<8} {:<8} {}",
            i + 1,
            m.category,
            m.priority,
            if m.active { "yes" } else { "no" },
            m.timestamp.format("%Y-%m-%d %H:%M")
        );
        println!("     {}", m.content);
    }

    Ok(())
}
