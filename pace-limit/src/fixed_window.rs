use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use quanta::Instant;

use crate::Clock;
use crate::ConfigError;
use crate::MonotonicClock;

/// A simple allowance based checker.
///
/// Unlike [`crate::RateLimiter`] this never blocks and has no notion of
/// slack: it answers yes or no. The allowance is not accumulated. Every check
/// recomputes it from the time since the previous check alone,
/// `elapsed / window × rate` capped at `rate`, and lets the request through
/// if at least one whole request fits. Checks arriving faster than one per
/// `window / rate` are therefore all denied, and idle time never buys more
/// than `rate`. The whole check runs under a single lock.
#[derive(Debug)]
pub struct FixedWindow {
    rate: f64,
    window: Duration,
    state: Mutex<Allowance>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug)]
struct Allowance {
    remaining: f64,
    last_check: Instant,
}

impl FixedWindow {
    /// Creates a new `FixedWindow` checker.
    ///
    /// # Arguments
    ///
    /// * `rate` - The maximum number of requests a single check can account for.
    /// * `window` - The duration over which `rate` is earned.
    pub fn new(rate: u64, window: Duration) -> Result<Self, ConfigError> {
        Self::with_clock(rate, window, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(
        rate: u64,
        window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        if rate == 0 {
            return Err(ConfigError::ZeroRate);
        }
        if window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }
        let rate = rate as f64;
        let last_check = clock.now();

        Ok(Self {
            rate,
            window,
            state: Mutex::new(Allowance {
                remaining: rate,
                last_check,
            }),
            clock,
        })
    }

    /// Check whether a request may proceed now.
    pub fn allow(&self) -> bool {
        let mut state = self.state.lock();

        let now = self.clock.now();
        let elapsed = now.duration_since(state.last_check);
        state.last_check = now;

        let allowance = (elapsed.as_secs_f64() / self.window.as_secs_f64() * self.rate)
            .floor()
            .min(self.rate);

        if allowance < 1.0 {
            state.remaining = allowance;
            return false;
        }
        state.remaining = allowance - 1.0;
        true
    }

    /// Whole requests left over from the most recent check.
    pub fn remaining(&self) -> u64 {
        self.state.lock().remaining as u64
    }
}
