use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the unix epoch
pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
