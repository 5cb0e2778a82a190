use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use quanta::Instant;
use quanta::Mock;

/// Source of time for the limiters.
///
/// Implementations must be cheap to call from the hot path. `sleep` is the
/// only operation allowed to block the calling thread.
pub trait Clock: Debug + Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;

    /// Block the calling thread until `duration` has elapsed on this clock.
    fn sleep(&self, duration: Duration);
}

/// The real monotonic clock.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    inner: quanta::Clock,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            inner: quanta::Clock::new(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        self.inner.now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A controllable clock for deterministic tests.
///
/// Time only moves when [`MockClock::advance`] is called or when a limiter
/// sleeps on it: `sleep` advances the shared mock time instead of blocking.
/// Clones share the same time source.
#[derive(Clone)]
pub struct MockClock {
    inner: quanta::Clock,
    mock: Arc<Mock>,
}

impl MockClock {
    pub fn new() -> Self {
        let (inner, mock) = quanta::Clock::mock();
        Self { inner, mock }
    }

    /// Move time forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.mock.increment(duration);
    }
}

impl Debug for MockClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockClock").field("now", &self.inner.now()).finish()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    #[inline]
    fn now(&self) -> Instant {
        self.inner.now()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
