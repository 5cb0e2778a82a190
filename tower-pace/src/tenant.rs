use std::time::Duration;
use std::time::SystemTime;

/// Tenant id used for requests that do not name one.
pub const DEFAULT_TENANT: &str = "default";

/// The outcome of admitting a request, handed to [`TenantResolver::admitted`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// The tenant the request was paced as.
    pub tenant: String,
    /// Wall clock time the request was admitted at.
    pub granted_at: SystemTime,
    /// How long the request was held back.
    pub waited: Duration,
}

/// Works out which tenant a request belongs to.
///
/// Any `Fn(&Req) -> Option<String>` is a resolver. Returning `None` paces the
/// request as [`DEFAULT_TENANT`].
pub trait TenantResolver<Req>: Send + Sync {
    fn resolve(&self, req: &Req) -> Option<String>;

    /// Called once the request has a slot, before it is passed on.
    fn admitted(&self, _req: &mut Req, _admission: &Admission) {}
}

impl<F, Req> TenantResolver<Req> for F
where
    F: Fn(&Req) -> Option<String> + Send + Sync,
{
    fn resolve(&self, req: &Req) -> Option<String> {
        self(req)
    }
}

#[cfg(feature = "axum")]
pub use header::HeaderTenant;

#[cfg(feature = "axum")]
mod header {
    use http::HeaderName;
    use http::Request;
    use http::header::InvalidHeaderName;

    use super::Admission;
    use super::TenantResolver;

    /// Resolves the tenant from a request header, `X-App-ID` by default.
    ///
    /// Admitted requests carry their [`Admission`] as a request extension.
    ///
    /// The header is whatever the client sends. Every distinct value gets its
    /// own limiter, which the registry keeps for its whole life, and its own
    /// `tenant` metric attribute set. Put this behind something that
    /// authenticates or bounds the tenant ids when clients are untrusted.
    #[derive(Debug, Clone)]
    pub struct HeaderTenant {
        header: HeaderName,
    }

    impl HeaderTenant {
        pub fn new(header: HeaderName) -> Self {
            Self { header }
        }

        pub fn named(header: &str) -> Result<Self, InvalidHeaderName> {
            Ok(Self::new(HeaderName::try_from(header)?))
        }

        pub fn header(&self) -> &HeaderName {
            &self.header
        }
    }

    impl Default for HeaderTenant {
        fn default() -> Self {
            Self::new(HeaderName::from_static("x-app-id"))
        }
    }

    impl<B> TenantResolver<Request<B>> for HeaderTenant
    where
        B: Send,
    {
        fn resolve(&self, req: &Request<B>) -> Option<String> {
            let value = req.headers().get(&self.header)?.to_str().ok()?.trim();
            (!value.is_empty()).then(|| value.to_owned())
        }

        fn admitted(&self, req: &mut Request<B>, admission: &Admission) {
            req.extensions_mut().insert(admission.clone());
        }
    }

}
