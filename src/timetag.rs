//! 64-bit NTP-style time tag, and its conversion to/from (seconds,
//! nanoseconds), per spec §4.1/§9.
//!
//! The rounding constants here (`0x2000_0000` on encode, `5e8` on decode)
//! are part of the wire contract, not an implementation detail — they are
//! carried over verbatim from the original `cosc_timetag_from_time` /
//! `cosc_timetag_to_time`.

/// A 64-bit NTP time tag: high 32 bits are seconds since the NTP epoch
/// (1900-01-01 00:00:00 UTC), low 32 bits are a fractional second where
/// `2^32` fractions equal one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeTag(pub u64);

impl TimeTag {
    /// The reserved "dispatch immediately" time tag used by convention
    /// throughout the OSC ecosystem.
    pub const IMMEDIATE: TimeTag = TimeTag(1);

    /// Builds a time tag from whole seconds and a nanosecond fraction.
    /// `nanos` may be `>= 1_000_000_000`; the overflow carries into `secs`.
    pub fn from_time(secs: u32, nanos: u32) -> TimeTag {
        let secs = secs.wrapping_add(nanos / 1_000_000_000);
        let nanos = (nanos % 1_000_000_000) as u64;

        let frac = ((nanos << 32) + 0x2000_0000) / 1_000_000_000;
        TimeTag(((secs as u64) << 32) | frac)
    }

    /// Splits a time tag back into (seconds, nanoseconds).
    pub fn to_time(self) -> (u32, u32) {
        let secs = (self.0 >> 32) as u32;
        let frac = self.0 & 0xffff_ffff;
        let nanos = ((frac * 1_000_000_000) + 500_000_000) >> 32;
        (secs, nanos as u32)
    }

    /// The raw 64-bit value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for TimeTag {
    fn from(value: u64) -> Self {
        TimeTag(value)
    }
}

impl From<TimeTag> for u64 {
    fn from(value: TimeTag) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_tenth_of_a_second() {
        let mut nanos = 0u32;
        while nanos < 1_000_000_000 {
            let tag = TimeTag::from_time(0, nanos);
            assert_eq!(tag.to_time(), (0, nanos), "nanos = {nanos}");
            nanos += 100_000;
        }
    }

    #[test]
    fn half_second_matches_documented_constant() {
        assert_eq!(TimeTag::from_time(0, 500_000_000).as_u64(), 0x0000_0000_8000_0000);
    }

    #[test]
    fn immediate_is_one() {
        assert_eq!(TimeTag::IMMEDIATE.as_u64(), 1);
    }
}
