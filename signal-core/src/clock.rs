//! Free-running millisecond timestamps.
//!
//! Nodes sample a 32-bit millisecond counter once per control cycle. The counter
//! wraps roughly every 49.7 days, so timestamps are never ordered directly; every
//! comparison goes through [`Millis::elapsed_since`], which subtracts with
//! wrap-around.

use core::fmt;
use core::ops::Add;
use core::time::Duration;

/// Snapshot of the free-running millisecond counter.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Millis(u32);

impl Millis {
    /// Counter value at power-up.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw counter value.
    #[must_use]
    pub const fn from_ticks(ticks: u32) -> Self {
        Self(ticks)
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn ticks(self) -> u32 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, tolerant of one counter wrap.
    #[must_use]
    pub const fn elapsed_since(self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.wrapping_sub(earlier.0) as u64)
    }

    /// Returns `true` once at least `interval` has passed since `since`.
    #[must_use]
    pub fn has_elapsed(self, since: Self, interval: Duration) -> bool {
        self.elapsed_since(since) >= interval
    }

    /// Advances the timestamp, wrapping like the hardware counter does.
    #[must_use]
    pub const fn wrapping_add(self, interval: Duration) -> Self {
        Self(self.0.wrapping_add(duration_ticks(interval)))
    }
}

impl Add<Duration> for Millis {
    type Output = Millis;

    fn add(self, rhs: Duration) -> Self::Output {
        self.wrapping_add(rhs)
    }
}

impl From<u32> for Millis {
    fn from(ticks: u32) -> Self {
        Self(ticks)
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Converts a duration to counter ticks, saturating at the counter range.
#[must_use]
pub const fn duration_ticks(interval: Duration) -> u32 {
    let millis = interval.as_millis();
    if millis > u32::MAX as u128 {
        u32::MAX
    } else {
        millis as u32
    }
}
