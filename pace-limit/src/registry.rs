use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::Clock;
use crate::ConfigError;
use crate::LimiterConfig;
use crate::MonotonicClock;
use crate::RateLimiter;
use crate::Settings;

/// One [`RateLimiter`] per tenant, created on first use.
///
/// Tenants listed in the configuration get their own settings, everyone else
/// gets a limiter built from the default settings. Either way each tenant has
/// an independent limiter: a busy tenant can only exhaust its own budget.
/// Limiters live as long as the registry does: there is no eviction, so the
/// registry grows with every distinct tenant id it is asked about.
///
/// ```rust
/// use pace_limit::{LimiterConfig, Registry};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let tenants = [("batch".to_string(), LimiterConfig::new(1, Duration::from_secs(1), 0))];
/// let registry = Registry::new(tenants, LimiterConfig::default()).unwrap();
///
/// let batch = registry.get_or_create("batch");
/// assert!(Arc::ptr_eq(&batch, &registry.get_or_create("batch")));
/// assert_eq!(registry.get_or_create("someone-else").settings().rate(), 5);
/// ```
#[derive(Debug)]
pub struct Registry {
    limiters: DashMap<String, Arc<RateLimiter>>,
    tenants: HashMap<String, Settings>,
    default: Settings,
    clock: Arc<dyn Clock>,
}

impl Registry {
    pub fn new<I>(tenants: I, default: LimiterConfig) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, LimiterConfig)>,
    {
        Self::with_clock(tenants, default, Arc::new(MonotonicClock::new()))
    }

    /// Build a registry whose limiters all run on `clock`.
    ///
    /// Every configuration is validated here, so creating a limiter later
    /// cannot fail.
    pub fn with_clock<I>(
        tenants: I,
        default: LimiterConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, LimiterConfig)>,
    {
        let tenants = tenants
            .into_iter()
            .map(|(tenant, config)| Ok((tenant, config.validate()?)))
            .collect::<Result<HashMap<_, _>, ConfigError>>()?;

        Ok(Self {
            limiters: DashMap::new(),
            tenants,
            default: default.validate()?,
            clock,
        })
    }

    /// The limiter for `tenant`, created from its configured or the default
    /// settings if this is the first time it is seen.
    pub fn get_or_create(&self, tenant: &str) -> Arc<RateLimiter> {
        self.get_or_create_with(tenant, &self.default)
    }

    /// Like [`Registry::get_or_create`], but an unconfigured tenant falls back
    /// to `fallback` rather than to the registry's default.
    ///
    /// Only the first call for a tenant decides its settings.
    pub fn get_or_create_with(&self, tenant: &str, fallback: &Settings) -> Arc<RateLimiter> {
        if let Some(limiter) = self.limiters.get(tenant) {
            return Arc::clone(limiter.value());
        }

        // The entry holds its shard locked until the limiter is stored, so
        // racing first calls all end up with the same instance.
        let limiter = self
            .limiters
            .entry(tenant.to_owned())
            .or_insert_with(|| {
                let (settings, configured) = match self.tenants.get(tenant) {
                    Some(settings) => (*settings, true),
                    None => (*fallback, false),
                };
                debug!(
                    tenant,
                    configured,
                    rate = settings.rate(),
                    window = ?settings.window(),
                    slack = settings.slack(),
                    "creating limiter"
                );
                Arc::new(RateLimiter::from_settings(settings, Arc::clone(&self.clock)))
            });

        Arc::clone(limiter.value())
    }

    /// The settings `tenant` runs with, or would run with on first use.
    pub fn settings_for(&self, tenant: &str) -> Settings {
        match self.limiters.get(tenant) {
            Some(limiter) => *limiter.settings(),
            None => self.tenants.get(tenant).copied().unwrap_or(self.default),
        }
    }

    pub fn default_settings(&self) -> &Settings {
        &self.default
    }

    pub fn contains(&self, tenant: &str) -> bool {
        self.limiters.contains_key(tenant)
    }

    /// The number of tenants a limiter has been created for.
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }
}
