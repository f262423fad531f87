//! CLI `memories decay` command: run the decay pass outside a conversation.

use anyhow::Result;

use smala::config::SmalaConfig;

/// Apply decay with the configured threshold and window.
pub fn decay(config: &SmalaConfig) -> Result<()> {
    let mut store = super::open_store(config)?;
    let threshold = config.memory.decay_threshold;
    let days = config.memory.decay_days;

    println!("Applying decay (priority < {threshold}, older than {days} days)...");
    let result = store.apply_decay(threshold, days)?;

    if result.deactivated > 0 {
        println!(
            "  Deactivated {} of {} active memories.",
            result.deactivated, result.examined
        );
    } else {
        println!("  No memories to decay.");
    }
    Ok(())
}
