//! Serde helpers for [`Duration`] fields.
//!
//! Durations are written as human readable text (`"1s"`, `"250ms"`, `"1m 30s"`).
//! On input an integer is also accepted and read as nanoseconds, which is how
//! many existing configuration files spell a duration.
//!
//! ```rust
//! use serde::Deserialize;
//! use std::time::Duration;
//!
//! #[derive(Deserialize)]
//! struct Timeouts {
//!     #[serde(with = "pace_limit::serde_duration")]
//!     wait: Duration,
//! }
//!
//! let t: Timeouts = serde_json::from_str(r#"{ "wait": "2s" }"#).unwrap();
//! assert_eq!(t.wait, Duration::from_secs(2));
//! ```

use std::time::Duration;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serializer;

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Text(String),
    Nanos(u64),
}

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&humantime::format_duration(*duration))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match Repr::deserialize(deserializer)? {
        Repr::Text(text) => humantime::parse_duration(&text).map_err(serde::de::Error::custom),
        Repr::Nanos(nanos) => Ok(Duration::from_nanos(nanos)),
    }
}
