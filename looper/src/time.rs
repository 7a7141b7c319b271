//! Process uptime clock used for message due times.

use std::sync::OnceLock;
use std::time::Instant;

/// Milliseconds since this clock was first consulted.
///
/// All due times in the scheduling layer are absolute values of this
/// clock, so `0` reliably sorts ahead of any real enqueue time (used by
/// front-of-queue posts).
pub fn uptime_millis() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_millis() as u64
}
