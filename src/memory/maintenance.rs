use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use super::types::Memory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecayResult {
    /// Memories that were still active when the pass started.
    pub examined: usize,
    /// Memories switched to inactive by this pass.
    pub deactivated: usize,
}

// ── Decay ────────────────────────────────────────────────────────────────────

/// Deactivate every memory with `priority < threshold` created before
/// `now - decay_days`.
///
/// Both conditions are required. Already inactive memories are left alone and
/// nothing is ever reactivated. A window reaching past the earliest
/// representable date means nothing is old enough to decay.
pub fn decay_memories(
    memories: &mut [Memory],
    threshold: i64,
    decay_days: u64,
    now: NaiveDateTime,
) -> DecayResult {
    let cutoff = decay_cutoff(now, decay_days);
    let mut result = DecayResult {
        examined: 0,
        deactivated: 0,
    };

    for memory in memories.iter_mut().filter(|m| m.active) {
        result.examined += 1;
        let expired = cutoff.is_some_and(|cutoff| memory.timestamp < cutoff);
        if memory.priority < threshold && expired {
            memory.active = false;
            result.deactivated += 1;
        }
    }

    result
}

fn decay_cutoff(now: NaiveDateTime, decay_days: u64) -> Option<NaiveDateTime> {
    i64::try_from(decay_days)
        .ok()
        .and_then(Duration::try_days)
        .and_then(|window| now.checked_sub_signed(window))
}
