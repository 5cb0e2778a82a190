use std::sync::Arc;
use std::time::Duration;

use quanta::Instant;

use crate::Clock;
use crate::Limiter;
use crate::MonotonicClock;
use crate::Reservation;

/// A limiter that admits everything immediately.
///
/// Used to opt a caller out of pacing while keeping the same interface.
#[derive(Debug)]
pub struct Unlimited {
    clock: Arc<dyn Clock>,
}

impl Unlimited {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Default for Unlimited {
    fn default() -> Self {
        Self::new()
    }
}

impl Limiter for Unlimited {
    #[inline]
    fn reserve(&self) -> Reservation {
        Reservation::immediate(self.clock.now())
    }

    #[inline]
    fn try_reserve(&self, _max_wait: Duration) -> Option<Reservation> {
        Some(self.reserve())
    }

    #[inline]
    fn take(&self) -> Instant {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use more_asserts::assert_ge;
    use more_asserts::assert_lt;

    use super::*;

    #[test]
    fn never_waits() {
        let clock = Arc::new(MonotonicClock::new());
        let rl = Unlimited::with_clock(clock.clone());

        let start = std::time::Instant::now();
        for _ in 0..10_000 {
            let called_at = clock.now();
            assert_ge!(rl.take(), called_at);
        }

        assert_lt!(start.elapsed(), Duration::from_secs(1));
    }

    #[test]
    fn reservations_are_immediate() {
        let rl = Unlimited::default();

        for _ in 0..100 {
            assert!(rl.reserve().is_immediate());
            assert!(rl.try_reserve(Duration::ZERO).unwrap().is_immediate());
        }
    }
}
