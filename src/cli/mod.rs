pub mod decay;
pub mod list;
pub mod stats;

use anyhow::{Context, Result};
use smala::config::SmalaConfig;
use smala::memory::store::MemoryStore;

/// Open the configured memory store, creating an empty file if needed.
fn open_store(config: &SmalaConfig) -> Result<MemoryStore> {
    let path = config.resolved_memory_path();
    MemoryStore::load(&path, &config.memory)
        .with_context(|| format!("failed to load memories from {}", path.display()))
}
