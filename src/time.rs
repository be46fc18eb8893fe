use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::{Add, Sub};

/// Timestamps are signed 64-bit nanosecond counts. Playback clocks can sit
/// before the epoch of whatever log is being replayed, so unlike a monotonic
/// robot clock this type must admit negative values.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Nanos(pub i64);

/// Window bound that effectively disables the bounded-extrapolation check.
pub const MAX_DURATION: Nanos = Nanos(i64::MAX);

impl Nanos {
    pub const ZERO: Nanos = Nanos(0);

    #[inline]
    pub fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn from_secs(secs: i64) -> Self {
        Nanos(secs.saturating_mul(1_000_000_000))
    }

    pub fn from_millis(millis: i64) -> Self {
        Nanos(millis.saturating_mul(1_000_000))
    }

    /// Absolute distance between two timestamps, saturating at the type bound.
    pub fn abs_diff(self, other: Nanos) -> Nanos {
        Nanos(i64::try_from(self.0.abs_diff(other.0)).unwrap_or(i64::MAX))
    }
}

impl From<i64> for Nanos {
    fn from(nanos: i64) -> Self {
        Nanos(nanos)
    }
}

impl From<Nanos> for i64 {
    fn from(nanos: Nanos) -> Self {
        nanos.0
    }
}

// Saturating rather than wrapping arithmetic: `MAX_DURATION` is used as an
// "unbounded" sentinel in window comparisons and must not wrap around.
impl Add for Nanos {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Nanos(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Nanos {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Nanos(self.0.saturating_sub(rhs.0))
    }
}

impl Display for Nanos {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0 < 0 {
            write!(f, "-")?;
        }
        let nanos = self.0.unsigned_abs();
        if nanos >= 1_000_000_000 {
            write!(f, "{:.3} s", nanos as f64 / 1_000_000_000.0)
        } else if nanos >= 1_000_000 {
            write!(f, "{:.3} ms", nanos as f64 / 1_000_000.0)
        } else if nanos >= 1_000 {
            write!(f, "{:.3} µs", nanos as f64 / 1_000.0)
        } else {
            write!(f, "{nanos} ns")
        }
    }
}
