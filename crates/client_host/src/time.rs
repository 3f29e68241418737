//! Wall-clock helpers for stamping persisted envelopes.

use std::cell::Cell;
#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};

thread_local! {
    static LAST_STAMP_MS: Cell<u64> = const { Cell::new(0) };
}

/// Current unix time in milliseconds.
pub fn unix_time_ms_now() -> u64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now().max(0.0) as u64
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Returns a strictly increasing stamp for this thread, never behind the wall clock.
pub fn next_envelope_stamp_ms() -> u64 {
    let now = unix_time_ms_now();
    LAST_STAMP_MS.with(|last| {
        let stamp = now.max(last.get().saturating_add(1));
        last.set(stamp);
        stamp
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_strictly_increase() {
        let a = next_envelope_stamp_ms();
        let b = next_envelope_stamp_ms();
        let c = next_envelope_stamp_ms();
        assert!(a < b && b < c);
    }

    #[test]
    fn stamp_saturates_instead_of_overflowing() {
        LAST_STAMP_MS.with(|last| last.set(u64::MAX));
        assert_eq!(next_envelope_stamp_ms(), u64::MAX);
    }
}
