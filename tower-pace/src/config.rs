use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use pace_limit::LimiterConfig;
use pace_limit::Registry;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::error::ConfigLoadError;

pub const DEFAULT_PORT: &str = ":8080";
pub const DEFAULT_TENANT_HEADER: &str = "X-App-ID";

/// Configuration of the admission front end.
///
/// The top level `rate`, `per` and `slack` describe the limiter every tenant
/// without an entry in `tenants` gets.
///
/// ```json
/// {
///   "rate": 5,
///   "slack": 10,
///   "per": "1s",
///   "port": ":8080",
///   "tenants": {
///     "batch": { "rate": 1, "window": "1s", "slack": 0 }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub rate: u64,
    pub slack: u64,
    #[serde(with = "pace_limit::serde_duration")]
    pub per: Duration,
    pub port: String,
    pub tenant_header: String,
    pub tenants: HashMap<String, LimiterConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rate: pace_limit::DEFAULT_RATE,
            slack: pace_limit::DEFAULT_SLACK,
            per: pace_limit::DEFAULT_WINDOW,
            port: DEFAULT_PORT.to_string(),
            tenant_header: DEFAULT_TENANT_HEADER.to_string(),
            tenants: HashMap::new(),
        }
    }
}

impl ServerConfig {
    /// Read the configuration at `path`.
    ///
    /// A missing file is not an error: the defaults are used instead.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "config not found, reverting to defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigLoadError::Io {
                    path: path.to_owned(),
                    source,
                });
            }
        };

        let mut config: Self =
            serde_json::from_str(&text).map_err(|source| ConfigLoadError::Parse {
                path: path.to_owned(),
                source,
            })?;
        if config.port.is_empty() {
            config.port = DEFAULT_PORT.to_string();
        }
        Ok(config)
    }

    /// The limiter configuration used for tenants not listed in `tenants`.
    pub fn default_limiter(&self) -> LimiterConfig {
        LimiterConfig::new(self.rate, self.per, self.slack)
    }

    /// Build the tenant registry this configuration describes.
    pub fn registry(&self) -> Result<Registry, ConfigLoadError> {
        let tenants = self
            .tenants
            .iter()
            .map(|(tenant, config)| (tenant.clone(), *config));
        Ok(Registry::new(tenants, self.default_limiter())?)
    }

    /// The socket address to bind, `":8080"` meaning every interface.
    pub fn listen_addr(&self) -> String {
        if self.port.starts_with(':') {
            format!("0.0.0.0{}", self.port)
        } else {
            self.port.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pace_limit::ConfigError;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_reverts_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(dir.path().join("config.json")).unwrap();

        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.rate, 5);
        assert_eq!(config.slack, 10);
        assert_eq!(config.per, Duration::from_secs(1));
        assert_eq!(config.port, ":8080");
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn reads_tenants() {
        let file = write_config(
            r#"{
                "rate": 20,
                "slack": 0,
                "per": "1m",
                "port": "127.0.0.1:9000",
                "tenants": {
                    "test-app1": { "rate": 2, "window": "1s", "slack": 1 }
                }
            }"#,
        );
        let config = ServerConfig::load(file.path()).unwrap();

        assert_eq!(
            config.default_limiter(),
            LimiterConfig::new(20, Duration::from_secs(60), 0)
        );
        assert_eq!(config.listen_addr(), "127.0.0.1:9000");

        let registry = config.registry().unwrap();
        let app = registry.get_or_create("test-app1");
        assert_eq!(app.settings().per_request(), Duration::from_millis(500));
        assert_eq!(app.settings().slack(), 1);
        assert_eq!(registry.get_or_create("other").settings().rate(), 20);
    }

    #[test]
    fn accepts_nanosecond_durations() {
        let file = write_config(r#"{ "rate": 5, "slack": 10, "per": 1000000000 }"#);
        let config = ServerConfig::load(file.path()).unwrap();

        assert_eq!(config.per, Duration::from_secs(1));
    }

    #[test]
    fn empty_port_falls_back() {
        let file = write_config(r#"{ "port": "" }"#);
        let config = ServerConfig::load(file.path()).unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let file = write_config("{ rate: ");

        assert!(matches!(
            ServerConfig::load(file.path()),
            Err(ConfigLoadError::Parse { .. })
        ));
    }

    #[test]
    fn invalid_limiters_are_rejected() {
        let file = write_config(r#"{ "rate": 0 }"#);
        let config = ServerConfig::load(file.path()).unwrap();

        assert!(matches!(
            config.registry(),
            Err(ConfigLoadError::Invalid(ConfigError::ZeroRate))
        ));
    }
}
