use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::ConfigError;

/// Default burst allowance, in requests.
pub const DEFAULT_SLACK: u64 = 10;

/// Default window a rate is expressed over.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Default rate used when a configuration omits one.
pub const DEFAULT_RATE: u64 = 5;

/// Serializable description of a single limiter.
///
/// ```rust
/// use pace_limit::LimiterConfig;
/// use std::time::Duration;
///
/// let config: LimiterConfig = serde_json::from_str(r#"{ "rate": 2, "window": "500ms" }"#).unwrap();
/// let settings = config.validate().unwrap();
///
/// assert_eq!(settings.per_request(), Duration::from_millis(250));
/// assert_eq!(settings.slack(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Requests admitted per `window`.
    pub rate: u64,
    /// The window `rate` is expressed over.
    #[serde(with = "crate::serde_duration")]
    pub window: Duration,
    /// Unused requests that may accumulate as burst capacity.
    pub slack: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            window: DEFAULT_WINDOW,
            slack: DEFAULT_SLACK,
        }
    }
}

impl LimiterConfig {
    pub fn new(rate: u64, window: Duration, slack: u64) -> Self {
        Self {
            rate,
            window,
            slack,
        }
    }

    /// Check the configuration and derive the limiter's intervals.
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        Settings::new(self.rate, self.window, self.slack)
    }
}

/// Validated, immutable limiter parameters.
///
/// All time quantities are held as signed nanoseconds, which is what the
/// limiter's state word is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    rate: u64,
    window: Duration,
    slack: u64,
    per_request_ns: i64,
    max_slack_ns: i64,
}

impl Settings {
    pub fn new(rate: u64, window: Duration, slack: u64) -> Result<Self, ConfigError> {
        if rate == 0 {
            return Err(ConfigError::ZeroRate);
        }
        if window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }
        let window_ns =
            i64::try_from(window.as_nanos()).map_err(|_| ConfigError::WindowTooLarge(window))?;

        // window_ns is positive, so this can only fit in an i64.
        let per_request_ns = (window_ns as u64 / rate) as i64;
        if per_request_ns == 0 {
            return Err(ConfigError::RateTooHigh { rate, window });
        }

        // The limiter adds max_slack and per_request together, so both the
        // product and the sum have to fit.
        let max_slack_ns = i64::try_from(slack)
            .ok()
            .and_then(|slack| slack.checked_mul(per_request_ns))
            .filter(|max_slack| max_slack.checked_add(per_request_ns).is_some())
            .ok_or(ConfigError::SlackOverflow { slack })?;

        Ok(Self {
            rate,
            window,
            slack,
            per_request_ns,
            max_slack_ns,
        })
    }

    pub fn rate(&self) -> u64 {
        self.rate
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn slack(&self) -> u64 {
        self.slack
    }

    /// The spacing enforced between consecutive requests.
    pub fn per_request(&self) -> Duration {
        Duration::from_nanos(self.per_request_ns as u64)
    }

    /// The largest burst credit a limiter can bank while idle.
    pub fn max_slack(&self) -> Duration {
        Duration::from_nanos(self.max_slack_ns as u64)
    }

    pub(crate) fn per_request_ns(&self) -> i64 {
        self.per_request_ns
    }

    pub(crate) fn max_slack_ns(&self) -> i64 {
        self.max_slack_ns
    }
}

impl TryFrom<LimiterConfig> for Settings {
    type Error = ConfigError;

    fn try_from(config: LimiterConfig) -> Result<Self, Self::Error> {
        config.validate()
    }
}

impl From<Settings> for LimiterConfig {
    fn from(settings: Settings) -> Self {
        Self::new(settings.rate, settings.window, settings.slack)
    }
}
