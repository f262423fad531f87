pub mod lock;
pub mod maintenance;
pub mod stats;
pub mod store;
pub mod types;

use chrono::{Local, NaiveDateTime, Timelike};

/// Current local time, truncated to microseconds to match the precision of
/// existing memory files.
pub fn local_now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}
