// crates/dataplane-core/src/core/time.rs
// ============================================================================
// Module: Time Helpers
// Description: Epoch-millisecond clock used across the data-plane SDK.
// Purpose: Keep timestamp handling uniform between entity and stores.
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Returns the current time as milliseconds since the Unix epoch.
#[must_use]
pub fn epoch_millis() -> i64 {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
}
