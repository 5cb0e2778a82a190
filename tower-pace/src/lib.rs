//! # Tower Pace
//!
//! `tower-pace` is per-tenant admission control for the
//! [Tower](https://github.com/tower-rs/tower) ecosystem, built on the lock-free
//! limiters of [`pace_limit`].
//!
//! ## Admission
//!
//! Requests are never rejected for being over their rate. The
//! [`AdmissionLayer`] resolves which tenant a request belongs to, claims that
//! tenant's next slot from a shared [`pace_limit::Registry`] and holds the
//! request until the slot comes round:
//!
//! 1. **Per Tenant**: each tenant has an independent budget, created on first use
//!    from its own configuration or the registry default.
//! 2. **Pacing**: bursts up to the configured slack go straight through, the rest
//!    are spaced out at the configured rate.
//! 3. **Timeouts**: an optional deadline covers the wait and the inner call,
//!    failing with [`PaceError::Timeout`].
//!
//! ## Feature Flags
//!
//! - `axum`: Enables `IntoResponse` for [`PaceError`] and the `X-App-ID` header
//!   resolver `HeaderTenant`.
//! - `server`: Builds the `pace-server` binary.

mod config;
mod error;
mod layer;
mod service;
mod tenant;


pub use config::DEFAULT_PORT;
pub use config::DEFAULT_TENANT_HEADER;
pub use config::ServerConfig;
pub use error::ConfigLoadError;
pub use error::PaceError;
pub use layer::AdmissionLayer;
pub use service::AdmissionService;
#[cfg(feature = "axum")]
pub use tenant::HeaderTenant;
pub use tenant::Admission;
pub use tenant::DEFAULT_TENANT;
pub use tenant::TenantResolver;
