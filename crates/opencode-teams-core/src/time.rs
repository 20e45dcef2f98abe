//! Wall-clock helper shared by every component that stamps a record.
//!
//! All persisted timestamps are integer milliseconds since epoch (spec
//! §6.2); callers pass `now_ms()` explicitly rather than each module
//! reaching for its own clock, which keeps the store/task-engine/inbox unit
//! tests deterministic.

use chrono::Utc;

pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ms_is_plausible_epoch_millis() {
        // Any time after 2020-01-01 in ms since epoch.
        assert!(now_ms() > 1_577_836_800_000);
    }
}
