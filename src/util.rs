//! Miscellaneous utility structs and functions.

use std::fmt::Debug;

/// An interval on the real number line.
#[derive(Copy, Clone, Default, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    /// Creates a new interval.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns true if this interval contains the value.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Gets the magnitude of the interval.
    pub fn length(&self) -> f64 {
        self.max - self.min
    }

    /// Linearly interpolates between `min` (t = 0) and `max` (t = 1).
    pub fn lerp(&self, t: f64) -> f64 {
        self.min + t * (self.max - self.min)
    }
}

impl Debug for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}

/// Accumulates a delay which doubles on each call to [Backoff::next_delay],
/// up to a maximum, and returns to its baseline on [Backoff::reset].
#[derive(Clone, Copy, Debug)]
pub struct Backoff {
    baseline: std::time::Duration,
    max: std::time::Duration,
    current: std::time::Duration,
}

impl Backoff {
    /// Creates a new backoff starting at `baseline`.
    pub fn new(baseline: std::time::Duration, max: std::time::Duration) -> Self {
        Self {
            baseline,
            max,
            current: baseline,
        }
    }

    /// Returns the delay to wait now, and doubles the following one.
    pub fn next_delay(&mut self) -> std::time::Duration {
        let delay = self.current;
        self.current = std::cmp::min(self.current * 2, self.max);
        delay
    }

    /// Returns the delay to its baseline.
    pub fn reset(&mut self) {
        self.current = self.baseline;
    }
}
