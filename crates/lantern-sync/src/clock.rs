//! Wall clock → beacon chain time.

use lantern_core::types::beacon::{MIN_GENESIS_TIME, SECONDS_PER_SLOT, SLOTS_PER_EPOCH};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Allowance for clock drift between us and the beacon node. The low value
/// protects against a server sending updates too far in the future.
pub const MAX_CLOCK_DISPARITY: Duration = Duration::from_secs(10);

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The slot containing a given unix timestamp. Zero before genesis.
pub fn slot_at_timestamp(timestamp: u64) -> u64 {
    timestamp.saturating_sub(MIN_GENESIS_TIME) / SECONDS_PER_SLOT
}

/// The current slot, with `tolerance` added to the wall clock to absorb
/// drift when validating signature slots.
pub fn current_slot(tolerance: Duration) -> u64 {
    slot_at_timestamp(unix_now() + tolerance.as_secs())
}

/// How long until the next epoch boundary.
pub fn time_until_next_epoch() -> Duration {
    let seconds_per_epoch = SLOTS_PER_EPOCH * SECONDS_PER_SLOT;
    let now = unix_now();
    if now < MIN_GENESIS_TIME {
        return Duration::from_secs(MIN_GENESIS_TIME - now);
    }
    let into_epoch = (now - MIN_GENESIS_TIME) % seconds_per_epoch;
    Duration::from_secs(seconds_per_epoch - into_epoch)
}
