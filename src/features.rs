//! Feature-query constants (spec §6.3).
//!
//! A constrained build might hard-code some of these to `false` to drop the
//! corresponding code; this crate targets a normal `std` platform, where all
//! of them hold. Each is a `const fn` rather than a Cargo feature flag: they
//! don't gate compilation, only advertise what's available, matching
//! `original_source/cosc.h`'s ABI-stable feature-query functions.

/// 64-bit integer (`h`) support.
pub const fn has_int64() -> bool {
    true
}

/// 32-bit float (`f`) support.
pub const fn has_float32() -> bool {
    true
}

/// 64-bit float (`d`) support.
pub const fn has_float64() -> bool {
    true
}

/// Endian-swap support (this crate always operates on big-endian wire
/// bytes regardless of host endianness, so this is trivially `true`).
pub const fn has_endian_swap() -> bool {
    true
}

/// OSC 1.1 homogeneous array (`[...]`) support.
pub const fn has_arrays() -> bool {
    true
}

/// Address pattern matching support.
pub const fn has_pattern_matching() -> bool {
    true
}

/// Time-tag (seconds/nanoseconds) conversion support.
pub const fn has_timetag_conversion() -> bool {
    true
}

/// Float-precision conversion support.
pub const fn has_float_precision_conversion() -> bool {
    true
}

/// Streaming writer support.
pub const fn has_writer() -> bool {
    true
}

/// Streaming reader support.
pub const fn has_reader() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_switch_is_enabled_on_this_platform() {
        assert!(has_int64());
        assert!(has_float32());
        assert!(has_float64());
        assert!(has_endian_swap());
        assert!(has_arrays());
        assert!(has_pattern_matching());
        assert!(has_timetag_conversion());
        assert!(has_float_precision_conversion());
        assert!(has_writer());
        assert!(has_reader());
    }
}
