//! Truncated UTC timestamp codec: 40 bits, hundredths-of-a-second resolution,
//! counted from 2020-01-01 00:00:00 UTC.
//!
//! The wall-clock itself is an external collaborator (see [`Clock`]) so that
//! callers can inject deterministic time in tests without faking the system
//! clock.

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds between the Unix epoch and 2020-01-01 00:00:00 UTC.
pub const BEGINNING_OF_TIME: u64 = 1_577_836_800;

/// Mask for the 40-bit truncated timestamp (5 octets).
pub const UINT40_MASK: u64 = 0x00FF_FFFF_FFFF;

/// Source of wall-clock time, expressed as (seconds since Unix epoch,
/// nanoseconds within that second). A capability boundary: the core never
/// calls `SystemTime::now()` directly outside of [`SystemClock`].
pub trait Clock {
    fn now_raw(&self) -> (u64, u32);
}

/// Default `Clock` backed by the operating system's wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_raw(&self) -> (u64, u32) {
        let dur = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        (dur.as_secs(), dur.subsec_nanos())
    }
}

/// Computes the 40-bit pico-timestamp for `(seconds, nanos)` since the Unix
/// epoch, saturating to zero for instants before [`BEGINNING_OF_TIME`].
pub fn encode_from_raw(seconds: u64, nanos: u32) -> u64 {
    let secs_since = seconds.saturating_sub(BEGINNING_OF_TIME);
    let hundredths = secs_since.saturating_mul(100) + (nanos as u64) / 10_000_000;
    hundredths & UINT40_MASK
}

/// Reads the current 40-bit timestamp from `clock`.
pub fn now(clock: &dyn Clock) -> u64 {
    let (secs, nanos) = clock.now_raw();
    encode_from_raw(secs, nanos)
}

/// Writes a 40-bit timestamp into an 8-byte little-endian wire field; the
/// upper 3 bytes are always zero.
pub fn to_wire(value: u64) -> [u8; 8] {
    (value & UINT40_MASK).to_le_bytes()
}

/// Reads a 40-bit timestamp back from its 8-byte little-endian wire field.
pub fn from_wire(bytes: [u8; 8]) -> u64 {
    u64::from_le_bytes(bytes) & UINT40_MASK
}

/// Converts a pico-timestamp (hundredths of a second since
/// [`BEGINNING_OF_TIME`]) to Unix epoch milliseconds.
pub fn to_epoch_millis(pico_time: u64) -> u64 {
    (pico_time + BEGINNING_OF_TIME * 100) * 10
}

/// A `Clock` that always returns a fixed instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub seconds: u64,
    pub nanos: u32,
}

impl Clock for FixedClock {
    fn now_raw(&self) -> (u64, u32) {
        (self.seconds, self.nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beginning_of_time_encodes_to_zero() {
        assert_eq!(encode_from_raw(BEGINNING_OF_TIME, 0), 0);
    }

    #[test]
    fn one_hundredth_of_a_second_after_epoch() {
        assert_eq!(encode_from_raw(BEGINNING_OF_TIME, 10_000_000), 1);
    }

    #[test]
    fn wire_roundtrip_keeps_upper_bytes_zero() {
        let value = 0x00FF_FFFF_FFFFu64;
        let wire = to_wire(value);
        assert_eq!(wire[5], 0);
        assert_eq!(wire[6], 0);
        assert_eq!(wire[7], 0);
        assert_eq!(from_wire(wire), value);
    }

    #[test]
    fn masks_out_of_range_values() {
        let huge = u64::MAX;
        assert_eq!(to_wire(huge), to_wire(huge & UINT40_MASK));
    }

    #[test]
    fn fixed_clock_is_deterministic() {
        let clock = FixedClock { seconds: BEGINNING_OF_TIME + 10, nanos: 0 };
        assert_eq!(now(&clock), 1000);
        assert_eq!(now(&clock), now(&clock));
    }

    #[test]
    fn epoch_millis_recovers_original_order_of_magnitude() {
        let clock = FixedClock { seconds: 1_700_000_000, nanos: 0 };
        let t = now(&clock);
        let millis = to_epoch_millis(t);
        // Within 10ms of the true instant, which is this codec's resolution.
        assert!((millis as i128 - 1_700_000_000_000i128).abs() <= 10);
    }
}
