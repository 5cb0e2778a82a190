use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use quanta::Instant;

use crate::Clock;
use crate::ConfigError;
use crate::Limiter;
use crate::MonotonicClock;
use crate::Reservation;
use crate::Settings;
use crate::config::DEFAULT_SLACK;
use crate::config::DEFAULT_WINDOW;

/// Compute the next permission time from the previous one.
///
/// All values are nanoseconds on the limiter's time line, where `0` marks a
/// limiter that has never granted anything.
///
/// * First use is never delayed.
/// * In strict mode (`max_slack == 0`) an idle gap longer than one interval
///   forfeits the unused capacity.
/// * Otherwise idle credit is capped at `max_slack`.
/// * In the steady state each call claims the slot one interval after the
///   previous one.
///
/// Every branch returns a value strictly greater than a non-zero `prev`.
#[inline]
pub fn next_permission(prev: i64, now: i64, per_request: i64, max_slack: i64) -> i64 {
    if prev == 0 {
        return now;
    }
    let idle = now.saturating_sub(prev);
    if max_slack == 0 && idle > per_request {
        now
    } else if max_slack > 0 && idle > max_slack.saturating_add(per_request) {
        now.saturating_sub(max_slack)
    } else {
        prev.saturating_add(per_request)
    }
}

/// A lock-free pacing rate limiter with bounded burst ("slack").
///
/// The whole state is one atomic word: the earliest time the next request
/// may be admitted. Callers race to advance it with compare-and-swap and then
/// wait out the difference between the slot they claimed and the current time.
/// How far that word trails behind "now" is the burst credit a caller may
/// spend without waiting.
///
/// ```rust
/// use pace_limit::RateLimiter;
/// use std::time::Duration;
///
/// let limiter = RateLimiter::builder(100)
///     .per(Duration::from_secs(1))
///     .slack(0)
///     .build()
///     .unwrap();
///
/// let first = limiter.take();
/// let second = limiter.take();
/// assert!(second.duration_since(first) >= Duration::from_millis(10));
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    /// Next permission time, in nanoseconds since `anchor` plus one.
    next: AtomicI64,
    settings: Settings,
    clock: Arc<dyn Clock>,
    /// A fixed point in time to calculate offsets from.
    anchor: Instant,
}

impl RateLimiter {
    /// Start configuring a limiter admitting `rate` requests per window.
    pub fn builder(rate: u64) -> Builder {
        Builder::new(rate)
    }

    /// A limiter with the default window and slack.
    pub fn new(rate: u64) -> Result<Self, ConfigError> {
        Self::builder(rate).build()
    }

    pub fn from_settings(settings: Settings, clock: Arc<dyn Clock>) -> Self {
        let anchor = clock.now();
        Self {
            next: AtomicI64::new(0),
            settings,
            clock,
            anchor,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Claim the next slot without blocking.
    ///
    /// The slot is consumed even if the caller never waits for it.
    pub fn reserve(&self) -> Reservation {
        match self.claim(i64::MAX) {
            Some(reservation) => reservation,
            None => unreachable!("an unbounded claim always succeeds"),
        }
    }

    /// Claim the next slot only if it comes round within `max_wait`.
    ///
    /// Returns `None` and leaves the limiter untouched when the caller would
    /// have to wait longer, so giving up costs the tenant no capacity.
    pub fn try_reserve(&self, max_wait: Duration) -> Option<Reservation> {
        self.claim(i64::try_from(max_wait.as_nanos()).unwrap_or(i64::MAX))
    }

    fn claim(&self, max_wait: i64) -> Option<Reservation> {
        let per_request = self.settings.per_request_ns();
        let max_slack = self.settings.max_slack_ns();

        loop {
            let now_instant = self.clock.now();
            let now = self.offset_of(now_instant);
            let prev = self.next.load(Ordering::Acquire);
            let next = next_permission(prev, now, per_request, max_slack);

            let wait = next.saturating_sub(now);
            if wait > max_wait {
                return None;
            }

            if self
                .next
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_err()
            {
                continue;
            }

            return Some(if wait > 0 {
                Reservation::new(self.instant_at(next), Duration::from_nanos(wait as u64))
            } else {
                Reservation::immediate(now_instant)
            });
        }
    }

    /// Wait for the next slot and return the instant it was granted at.
    ///
    /// Blocks the calling thread for as long as the pace requires. Never fails.
    pub fn take(&self) -> Instant {
        let reservation = self.reserve();
        if !reservation.wait().is_zero() {
            self.clock.sleep(reservation.wait());
        }
        reservation.granted()
    }

    // Readings start at 1 so that 0 is free to mark an unused limiter.
    fn offset_of(&self, instant: Instant) -> i64 {
        instant.duration_since(self.anchor).as_nanos() as i64 + 1
    }

    fn instant_at(&self, offset: i64) -> Instant {
        self.anchor + Duration::from_nanos((offset - 1) as u64)
    }
}

impl Limiter for RateLimiter {
    fn reserve(&self) -> Reservation {
        RateLimiter::reserve(self)
    }

    fn try_reserve(&self, max_wait: Duration) -> Option<Reservation> {
        RateLimiter::try_reserve(self, max_wait)
    }

    fn take(&self) -> Instant {
        RateLimiter::take(self)
    }
}

/// Options for a [`RateLimiter`].
#[derive(Debug, Clone)]
pub struct Builder {
    rate: u64,
    window: Duration,
    slack: u64,
    clock: Option<Arc<dyn Clock>>,
}

impl Builder {
    fn new(rate: u64) -> Self {
        Self {
            rate,
            window: DEFAULT_WINDOW,
            slack: DEFAULT_SLACK,
            clock: None,
        }
    }

    /// The window `rate` is expressed over. Defaults to one second.
    pub fn per(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Unused requests that may be banked for a later burst. Defaults to 10,
    /// `0` disables bursting.
    pub fn slack(mut self, slack: u64) -> Self {
        self.slack = slack;
        self
    }

    /// Use `clock` instead of the monotonic system clock.
    pub fn clock<C>(self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.shared_clock(Arc::new(clock))
    }

    pub fn shared_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<RateLimiter, ConfigError> {
        let settings = Settings::new(self.rate, self.window, self.slack)?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        Ok(RateLimiter::from_settings(settings, clock))
    }
}
