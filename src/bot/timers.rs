//! Saturating countdown timers
//!
//! All throttles in the decision loop (AOE spacing, crowd-control spacing,
//! threat-check interval, heal claims) share this one abstraction instead of
//! clamping by hand.

/// A countdown in milliseconds that never goes below zero.
///
/// An optional ceiling bounds the value; anything set above it is clamped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaturatingCountdown {
    remaining: u32,
    ceiling: Option<u32>,
}

impl SaturatingCountdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ceiling(ceiling: u32) -> Self {
        Self {
            remaining: 0,
            ceiling: Some(ceiling),
        }
    }

    /// Advance by `elapsed` ms.
    pub fn tick(&mut self, elapsed: u32) {
        self.remaining = self.remaining.saturating_sub(elapsed);
    }

    pub fn set(&mut self, duration: u32) {
        self.remaining = match self.ceiling {
            Some(ceiling) => duration.min(ceiling),
            None => duration,
        };
    }

    pub fn clear(&mut self) {
        self.remaining = 0;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.remaining > 0
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }
}

/// A repeating interval: `tick` reports true once per elapsed period.
#[derive(Clone, Copy, Debug)]
pub struct IntervalTimer {
    countdown: SaturatingCountdown,
    period: u32,
}

impl IntervalTimer {
    /// First expiry happens after `initial_delay` ms, then every `period` ms.
    pub fn new(period: u32, initial_delay: u32) -> Self {
        let mut countdown = SaturatingCountdown::new();
        countdown.set(initial_delay);
        Self { countdown, period }
    }

    pub fn tick(&mut self, elapsed: u32) -> bool {
        self.countdown.tick(elapsed);
        if self.countdown.is_expired() {
            self.countdown.set(self.period);
            true
        } else {
            false
        }
    }
}

/// Counts upward; used for "how long have we been waiting" measurements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stopwatch {
    elapsed: u32,
}

impl Stopwatch {
    pub fn tick(&mut self, elapsed: u32) {
        self.elapsed = self.elapsed.saturating_add(elapsed);
    }

    pub fn reset(&mut self) {
        self.elapsed = 0;
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_saturates_at_zero() {
        let mut timer = SaturatingCountdown::new();
        timer.set(500);
        timer.tick(200);
        assert_eq!(timer.remaining(), 300);
        timer.tick(1000);
        assert_eq!(timer.remaining(), 0);
        assert!(timer.is_expired());
        timer.tick(1000);
        assert_eq!(timer.remaining(), 0);
    }

    #[test]
    fn test_ceiling_clamps_set() {
        let mut timer = SaturatingCountdown::with_ceiling(3000);
        timer.set(10_000);
        assert_eq!(timer.remaining(), 3000);
        timer.set(300);
        assert_eq!(timer.remaining(), 300);
    }

    #[test]
    fn test_interval_fires_once_per_period() {
        let mut interval = IntervalTimer::new(1000, 2000);
        assert!(!interval.tick(1000));
        assert!(interval.tick(1000));
        assert!(!interval.tick(500));
        assert!(interval.tick(500));
    }

    #[test]
    fn test_stopwatch_accumulates() {
        let mut watch = Stopwatch::default();
        watch.tick(400);
        watch.tick(600);
        assert_eq!(watch.elapsed(), 1000);
        watch.reset();
        assert_eq!(watch.elapsed(), 0);
    }
}
