//! Exact time base for composition math.
//!
//! Every time inside a composition is an integer number of ticks at
//! [`TIMESCALE`] ticks per second. Floating-point seconds from the project
//! are converted once, at the boundary, so concatenating hundreds of
//! segments never accumulates drift.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// Ticks per second (the MPEG 90 kHz clock).
pub const TIMESCALE: i64 = 90_000;

/// A point in time or a duration, in ticks of [`TIMESCALE`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MediaTime(i64);

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime(0);

    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Convert seconds to the nearest tick. Non-finite input maps to zero.
    pub fn from_secs(secs: f64) -> Self {
        if !secs.is_finite() {
            return Self::ZERO;
        }
        Self((secs * TIMESCALE as f64).round() as i64)
    }

    pub const fn ticks(self) -> i64 {
        self.0
    }

    pub fn as_secs(self) -> f64 {
        self.0 as f64 / TIMESCALE as f64
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `self * num / den`, rounded to the nearest tick.
    pub fn mul_ratio(self, num: MediaTime, den: MediaTime) -> Self {
        if den.0 == 0 {
            return self;
        }
        Self(div_round(self.0 as i128 * num.0 as i128, den.0 as i128))
    }
}

fn div_round(num: i128, den: i128) -> i64 {
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    let half = den / 2;
    let q = if num >= 0 {
        (num + half) / den
    } else {
        (num - half) / den
    };
    q as i64
}

impl Add for MediaTime {
    type Output = MediaTime;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for MediaTime {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for MediaTime {
    type Output = MediaTime;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs())
    }
}

/// A half-open span `[start, start + duration)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: MediaTime,
    pub duration: MediaTime,
}

impl TimeRange {
    pub const fn new(start: MediaTime, duration: MediaTime) -> Self {
        Self { start, duration }
    }

    /// Build a range from `[start, end)` seconds.
    pub fn from_secs(start: f64, end: f64) -> Self {
        let start = MediaTime::from_secs(start);
        let end = MediaTime::from_secs(end);
        Self::new(start, (end - start).max(MediaTime::ZERO))
    }

    pub fn end(&self) -> MediaTime {
        self.start + self.duration
    }

    pub fn is_empty(&self) -> bool {
        self.duration <= MediaTime::ZERO
    }

    pub fn contains(&self, t: MediaTime) -> bool {
        t >= self.start && t < self.end()
    }

    /// Whether `other` lies entirely inside this range.
    pub fn encloses(&self, other: &TimeRange) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_convert_to_exact_ticks() {
        assert_eq!(MediaTime::from_secs(1.0).ticks(), 90_000);
        assert_eq!(MediaTime::from_secs(0.1).ticks(), 9_000);
        assert_eq!(MediaTime::from_secs(f64::NAN), MediaTime::ZERO);
        assert!((MediaTime::from_ticks(45_000).as_secs() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_concatenation_does_not_drift() {
        let piece = MediaTime::from_secs(1.0 / 3.0);
        let mut cursor = MediaTime::ZERO;
        for _ in 0..3_000 {
            cursor += piece;
        }
        assert_eq!(cursor, MediaTime::from_ticks(piece.ticks() * 3_000));
    }

    #[test]
    fn test_mul_ratio_rounds() {
        let t = MediaTime::from_ticks(10);
        assert_eq!(
            t.mul_ratio(MediaTime::from_ticks(1), MediaTime::from_ticks(3)),
            MediaTime::from_ticks(3)
        );
        assert_eq!(t.mul_ratio(MediaTime::from_ticks(1), MediaTime::ZERO), t);
    }

    #[test]
    fn test_range_relations() {
        let a = TimeRange::from_secs(0.0, 10.0);
        let b = TimeRange::from_secs(10.0, 12.0);
        assert!(!a.overlaps(&b));
        assert!(a.contains(MediaTime::from_secs(9.99)));
        assert!(!a.contains(MediaTime::from_secs(10.0)));
        assert!(a.encloses(&TimeRange::from_secs(2.0, 3.0)));
        assert!(TimeRange::from_secs(5.0, 4.0).is_empty());
        assert_eq!(a.to_string(), "[0.000s, 10.000s)");
    }
}
