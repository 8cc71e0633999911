use chrono::Utc;

/// Wall-clock milliseconds since the Unix epoch.
///
/// Every timestamp the engine stores or compares is expressed in this unit.
pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

pub const SECOND_MS: u64 = 1_000;
pub const MINUTE_MS: u64 = 60 * SECOND_MS;
