use anyhow::Result;

use smala::config::SmalaConfig;

/// Display memory statistics in the terminal.
pub fn stats(config: &SmalaConfig) -> Result<()> {
    let store = super::open_store(config)?;
    let response = store.stats();

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  File:                {}", store.path().display());
    println!("  Total memories:      {}", response.total_memories);
    println!("  Active:              {}", response.active_memories);
    println!("  Inactive (decayed):  {}", response.inactive_memories);
    println!();

    println!("By Category:");
    for (category, count) in &response.by_category {
        println!("  {:<22} {}", category, count);
    }
    println!();

    println!("By Priority:");
    for (priority, count) in &response.by_priority {
        println!("  {:<22} {}", format!("{priority}/5"), count);
    }
    println!();

    if let Some(ref oldest) = response.oldest_memory {
        println!("Oldest memory:         {oldest}");
    }
    if let Some(ref newest) = response.newest_memory {
        println!("Newest memory:         {newest}");
    }

    Ok(())
}
