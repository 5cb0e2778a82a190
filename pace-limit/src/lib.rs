//! # pace-limit
//!
//! `pace-limit` provides lock-free, per-tenant admission control.
//!
//! ## Core Philosophy
//!
//! A pacing limiter does not reject work: it tells the caller *when* it may
//! proceed. The entire state of a [`RateLimiter`] is a single atomic word
//! holding the earliest instant the next request may be admitted. Callers
//! advance it with Compare-And-Swap (CAS) and wait out the difference, so
//! admission never takes a lock, and the amount of unused capacity a tenant
//! may burst through is simply how far that word trails behind "now".
//!
//! ## Key Concepts
//!
//! * **Lock-Free**: No `Mutex` or `RwLock` in the hot path.
//! * **Bounded Slack**: Idle time banks at most `slack` requests of burst credit.
//! * **Per Tenant**: A [`Registry`] lazily creates one independent limiter per tenant.
//! * **Pluggable Time**: Every limiter runs on a [`Clock`], so tests can use [`MockClock`].
//!
//! ## Example
//!
//! ```rust
//! use pace_limit::RateLimiter;
//! use std::time::Duration;
//!
//! let limiter = RateLimiter::builder(100)
//!     .per(Duration::from_secs(1))
//!     .slack(10)
//!     .build()
//!     .unwrap();
//!
//! // Blocks until the request may proceed.
//! let _granted = limiter.take();
//! ```

use std::fmt::Debug;
use std::time::Duration;

use quanta::Instant;

mod clock;
mod config;
mod error;
mod fixed_window;
mod limiter;
mod registry;
pub mod serde_duration;
mod unlimited;

pub use clock::Clock;
pub use clock::MockClock;
pub use clock::MonotonicClock;
pub use config::DEFAULT_RATE;
pub use config::DEFAULT_SLACK;
pub use config::DEFAULT_WINDOW;
pub use config::LimiterConfig;
pub use config::Settings;
pub use error::ConfigError;
pub use fixed_window::FixedWindow;
pub use limiter::Builder;
pub use limiter::RateLimiter;
pub use limiter::next_permission;
pub use registry::Registry;
pub use unlimited::Unlimited;

pub use quanta;

/// A claimed admission slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    granted: Instant,
    wait: Duration,
}

impl Reservation {
    pub(crate) fn new(granted: Instant, wait: Duration) -> Self {
        Self { granted, wait }
    }

    pub(crate) fn immediate(now: Instant) -> Self {
        Self::new(now, Duration::ZERO)
    }

    /// The instant the request is admitted at.
    pub fn granted(&self) -> Instant {
        self.granted
    }

    /// How long the caller must wait before proceeding.
    pub fn wait(&self) -> Duration {
        self.wait
    }

    pub fn is_immediate(&self) -> bool {
        self.wait.is_zero()
    }
}

/// The common interface of the pacing limiters.
///
/// Limiters must be `Send` and `Sync` to allow sharing across thread
/// boundaries via `Arc`.
pub trait Limiter: Debug + Send + Sync {
    /// Claim the next admission slot without blocking.
    ///
    /// Async callers use this and wait out [`Reservation::wait`] on their own
    /// timer.
    fn reserve(&self) -> Reservation;

    /// Claim the next slot only if the wait for it is at most `max_wait`.
    ///
    /// A refusal must leave the limiter as it was.
    fn try_reserve(&self, max_wait: Duration) -> Option<Reservation>;

    /// Block until the next admission slot and return its instant.
    ///
    /// This never fails; the only outcome of contention is latency.
    fn take(&self) -> Instant;
}
