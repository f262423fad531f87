use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

use super::types::Memory;

#[derive(Debug, Serialize)]
pub struct MemoryStats {
    pub total_memories: usize,
    pub active_memories: usize,
    pub inactive_memories: usize,
    /// Total count per category, active or not.
    pub by_category: BTreeMap<String, usize>,
    /// Total count per priority, active or not.
    pub by_priority: BTreeMap<i64, usize>,
    pub oldest_memory: Option<NaiveDateTime>,
    pub newest_memory: Option<NaiveDateTime>,
}

/// Summarize a memory list.
pub fn memory_stats(memories: &[Memory]) -> MemoryStats {
    let mut by_category = BTreeMap::new();
    let mut by_priority = BTreeMap::new();
    for m in memories {
        *by_category.entry(m.category.clone()).or_insert(0) += 1;
        *by_priority.entry(m.priority).or_insert(0) += 1;
    }

    let active_memories = memories.iter().filter(|m| m.active).count();

    MemoryStats {
        total_memories: memories.len(),
        active_memories,
        inactive_memories: memories.len() - active_memories,
        by_category,
        by_priority,
        oldest_memory: memories.iter().map(|m| m.timestamp).min(),
        newest_memory: memories.iter().map(|m| m.timestamp).max(),
    }
}
