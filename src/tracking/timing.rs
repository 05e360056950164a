//! Latency measurement: a monotonic clock seam and an incremental mean.

use std::time::Instant;

/// Monotonic time source in milliseconds.
///
/// The tracking loop and the launch tuner time blocking `refine` calls
/// through this trait so that tests can substitute deterministic timings.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall-clock time since construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }
}

/// Running mean with the update `mean' = (count * mean + sample) / (count + 1)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMean {
    mean: f64,
    count: u64,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: f64) {
        self.mean = (self.count as f64 * self.mean + sample) / (self.count as f64 + 1.0);
        self.count += 1;
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Clock driven by hand; clones share the same time.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct ManualClock(pub Rc<Cell<f64>>);

    impl ManualClock {
        pub fn advance(&self, ms: f64) {
            self.0.set(self.0.get() + ms);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> f64 {
            self.0.get()
        }
    }

    #[test]
    fn test_running_mean_matches_arithmetic_mean() {
        let samples = [3.0, 5.0, 10.0, 2.0];
        let mut mean = RunningMean::new();
        for s in samples {
            mean.push(s);
        }

        assert_eq!(mean.count(), 4);
        assert_relative_eq!(mean.mean(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_infinite_sample_poisons_mean() {
        let mut mean = RunningMean::new();
        mean.push(1.0);
        mean.push(f64::INFINITY);
        assert!(mean.mean().is_infinite());
    }

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
