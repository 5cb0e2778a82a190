use std::time::Duration;

/// Reasons a limiter configuration is rejected.
///
/// Construction is the only fallible step: once a limiter exists its
/// operations cannot fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `rate` must admit at least one request per window.
    #[error("rate must be greater than zero")]
    ZeroRate,

    /// `window` must be a non-empty duration.
    #[error("window must be greater than zero")]
    ZeroWindow,

    /// The window does not fit in signed 64-bit nanoseconds.
    #[error("window {0:?} is too large")]
    WindowTooLarge(Duration),

    /// `window / rate` would round down to zero nanoseconds.
    #[error("rate {rate} per {window:?} is finer than one request per nanosecond")]
    RateTooHigh {
        /// The requested rate.
        rate: u64,
        /// The requested window.
        window: Duration,
    },

    /// `slack × per-request interval` does not fit in signed 64-bit nanoseconds.
    #[error("slack of {slack} requests overflows the limiter's time range")]
    SlackOverflow {
        /// The requested slack.
        slack: u64,
    },
}
