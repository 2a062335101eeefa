//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep thread ids, function addresses and durations
//! apart in signatures that would otherwise take three bare integers.

use std::fmt;

/// Thread ID
///
/// Kernel thread id of the traced process. One timer chain exists per `Tid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tid(pub i32);

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID:{}", self.0)
    }
}

/// Absolute function address
///
/// Displayed as lower-case hex with a `0x` prefix, which is also the form the
/// address column of the live functions view renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionAddress(pub u64);

impl fmt::Display for FunctionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Duration in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Duration(pub u64);

impl Duration {
    const NANOS_PER_MICRO: u64 = 1_000;
    const NANOS_PER_MILLI: u64 = 1_000_000;
    const NANOS_PER_SEC: u64 = 1_000_000_000;
    const NANOS_PER_MIN: u64 = 60 * Self::NANOS_PER_SEC;
    const NANOS_PER_HOUR: u64 = 60 * Self::NANOS_PER_MIN;
    const NANOS_PER_DAY: u64 = 24 * Self::NANOS_PER_HOUR;
}

impl fmt::Display for Duration {
    /// Picks the largest unit that keeps the value at or above one, from
    /// nanoseconds up to days, with three decimals.
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = self.0;
        let (unit, suffix) = match ns {
            n if n < Self::NANOS_PER_MICRO => return write!(f, "{n} ns"),
            n if n < Self::NANOS_PER_MILLI => (Self::NANOS_PER_MICRO, "us"),
            n if n < Self::NANOS_PER_SEC => (Self::NANOS_PER_MILLI, "ms"),
            n if n < Self::NANOS_PER_MIN => (Self::NANOS_PER_SEC, "s"),
            n if n < Self::NANOS_PER_HOUR => (Self::NANOS_PER_MIN, "min"),
            n if n < Self::NANOS_PER_DAY => (Self::NANOS_PER_HOUR, "h"),
            _ => (Self::NANOS_PER_DAY, "days"),
        };
        write!(f, "{:.3} {suffix}", ns as f64 / unit as f64)
    }
}
